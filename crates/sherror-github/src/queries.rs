//! GraphQL documents for the GitHub discussions API.

pub const REPOSITORY: &str = r#"
query Repository($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    discussionCategories(first: 100) {
      nodes { id name }
    }
  }
}
"#;

pub const DISCUSSION: &str = r#"
query Discussion($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    discussion(number: $number) {
      id number title body
      category { id }
    }
  }
}
"#;

pub const DISCUSSIONS_IN_CATEGORY: &str = r#"
query Discussions($owner: String!, $name: String!, $categoryId: ID!, $first: Int!) {
  repository(owner: $owner, name: $name) {
    discussions(first: $first, categoryId: $categoryId) {
      nodes {
        id number title body
        category { id }
      }
    }
  }
}
"#;

pub const CREATE_DISCUSSION: &str = r#"
mutation CreateDiscussion($repositoryId: ID!, $categoryId: ID!, $title: String!, $body: String!) {
  createDiscussion(input: { repositoryId: $repositoryId, categoryId: $categoryId, title: $title, body: $body }) {
    discussion { id number url }
  }
}
"#;

pub const UPDATE_DISCUSSION: &str = r#"
mutation UpdateDiscussion($discussionId: ID!, $title: String!, $body: String!) {
  updateDiscussion(input: { discussionId: $discussionId, title: $title, body: $body }) {
    discussion { id }
  }
}
"#;

pub const DELETE_DISCUSSION: &str = r#"
mutation DeleteDiscussion($id: ID!) {
  deleteDiscussion(input: { id: $id }) {
    discussion { id }
  }
}
"#;
