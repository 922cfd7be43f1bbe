#![allow(dead_code)]

use odmlayer::{id, memory::InMemoryStore, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize, Schema)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(skip)]
    pub document: DocumentState,
}

impl User {
    pub fn named(name: &str) -> Self {
        Self {
            id: id::nil(),
            name: name.to_string(),
            document: DocumentState::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Schema)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[schema(tag(model = "User"))]
    pub author: Option<ObjectId>,
    #[schema(tag(model = "User", link = "User"))]
    pub reviewer: Option<ObjectId>,
    #[serde(skip)]
    pub document: DocumentState,
}

impl Post {
    pub fn titled(title: &str) -> Self {
        Self {
            id: id::nil(),
            title: title.to_string(),
            author: None,
            reviewer: None,
            document: DocumentState::default(),
        }
    }
}

/// Uses non-default field names for identity and state.
#[derive(Debug, Clone, Serialize, Deserialize, Schema)]
#[schema(name = "Remark")]
pub struct Comment {
    #[schema(id)]
    #[serde(rename = "key")]
    pub ident: ObjectId,
    #[schema(tag(model = "Post"))]
    #[serde(rename = "postId")]
    pub post: Option<ObjectId>,
    pub body: String,
    #[schema(state)]
    #[serde(skip)]
    pub meta: DocumentState,
}

impl Comment {
    pub fn on(post: ObjectId, body: &str) -> Self {
        Self {
            ident: id::nil(),
            post: Some(post),
            body: body.to_string(),
            meta: DocumentState::default(),
        }
    }
}

/// Serializes without its identity field.
#[derive(Debug, Clone, Serialize, Deserialize, Schema)]
pub struct Draft {
    #[serde(skip, default = "odmlayer::id::nil")]
    pub id: ObjectId,
    pub text: String,
    #[serde(skip)]
    pub document: DocumentState,
}

/// Registers `User` and `Post` and seals, returning the store for inspection.
pub async fn blog() -> (InMemoryStore, Odm) {
    let store = InMemoryStore::new();
    let mut builder = Odm::builder(store.clone());

    builder.register(User::named(""), "users").await.unwrap();
    builder.register(Post::titled(""), "posts").await.unwrap();

    (store, builder.seal())
}

/// Creates and saves a user.
pub async fn saved_user(odm: &Odm, name: &str) -> User {
    let mut user = User::named(name);
    odm.create(&mut user).unwrap();
    odm.save(&mut user).await.unwrap();
    user
}
