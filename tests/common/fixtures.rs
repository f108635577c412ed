//! Record types shared by the integration tests.

use tusk::prelude::*;
use tusk::{ModelInfo, record};

record! {
    pub struct Author {
        table: "author",
        primary_key: ["author_id"],
        fields: { author_id: i64, name: String },
    }
}

record! {
    /// An author rendered as its reference form when nested.
    pub struct AuthorRef {
        table: "author",
        primary_key: ["author_id"],
        fields: { author_id: i64, name: String },
        reference: as_reference
    }
}

impl AuthorRef {
    fn as_reference(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "ref": format!("author/{}", self.author_id()?) }))
    }
}

record! {
    pub struct Comment {
        table: "comment",
        primary_key: ["comment_id"],
        fields: { comment_id: i64, post_id: i64, body: String },
        relations: [post]
    }
}

impl Comment {
    fn post(&self, engine: &dyn Engine) -> tusk::Result<Relation> {
        Ok(Relation::optional(Post::find_first(
            engine,
            ("post_id", "=", self.post_id()),
        )?))
    }
}

record! {
    pub struct Post {
        table: "post",
        primary_key: ["post_id"],
        fields: { post_id: i64, author_id: i64, title: String },
        relations: [author, comments, slug, tags]
    }
}

impl Post {
    fn author(&self, engine: &dyn Engine) -> tusk::Result<Relation> {
        Ok(Relation::optional(Author::find_first(
            engine,
            ("author_id", "=", self.author_id()),
        )?))
    }

    fn comments(&self, _engine: &dyn Engine) -> tusk::Result<Relation> {
        Ok(Relation::Deferred(
            Comment::compiler()?.r#where(("post_id", "=", self.post_id())),
        ))
    }

    fn slug(&self, _engine: &dyn Engine) -> tusk::Result<Relation> {
        Ok(self
            .title()
            .map_or(Relation::None, |title| {
                Relation::Scalar(title.to_lowercase().replace(' ', "-").into())
            }))
    }

    fn tags(&self, _engine: &dyn Engine) -> tusk::Result<Relation> {
        Ok(Relation::List(vec![
            Relation::Scalar("rust".into()),
            Relation::None,
        ]))
    }
}

record! {
    /// Post whose author is emitted as a reference.
    pub struct Article {
        table: "post",
        primary_key: ["post_id"],
        fields: { post_id: i64, author_id: i64, title: String },
        relations: [author]
    }
}

impl Article {
    fn author(&self, engine: &dyn Engine) -> tusk::Result<Relation> {
        Ok(Relation::optional(AuthorRef::find_first(
            engine,
            ("author_id", "=", self.author_id()),
        )?))
    }
}

record! {
    pub struct User {
        table: "user",
        primary_key: ["user_id"],
        fields: { user_id: i64, email: String },
    }
}

record! {
    pub struct Admin {
        table: "admin",
        primary_key: ["admin_id"],
        inherits: User => ("user_id", "user_id"),
        fields: { admin_id: i64, user_id: i64, level: i32 },
    }
}

record! {
    pub struct Membership {
        table: "membership",
        primary_key: ["group_id", "user_id"],
        fields: { group_id: i64, user_id: i64, role: String },
    }
}

/// A record implemented by hand, recording its lifecycle hooks.
#[derive(Debug, Clone, Default)]
pub struct Note {
    fields: Fields,
    pub events: Vec<&'static str>,
}

static NOTE: ModelInfo = ModelInfo {
    name: "Note",
    table: "note",
    primary_key: &["note_id"],
    columns: &["note_id", "body", "created_at"],
    parent: None,
    load: tusk::core::record::load_boxed::<Note>,
};

impl Entity for Note {
    fn model(&self) -> &'static ModelInfo {
        &NOTE
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl Record for Note {
    fn descriptor() -> &'static ModelInfo {
        &NOTE
    }

    fn from_fields(fields: Fields) -> tusk::Result<Self> {
        if fields.get("body").is_some_and(|body| !body.is_null() && body.as_str().is_none()) {
            return Err(TuskError::Mapping("note body must be text".into()));
        }
        Ok(Self {
            fields,
            events: Vec::new(),
        })
    }

    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn before_create(&mut self) -> tusk::Result<()> {
        self.events.push("before_create");
        if self.get("body").and_then(Value::as_str) == Some("") {
            return Err(TuskError::Mapping("empty note".into()));
        }
        Ok(())
    }

    fn before_update(&mut self) -> tusk::Result<()> {
        self.events.push("before_update");
        Ok(())
    }

    fn after_update(&mut self) -> tusk::Result<()> {
        self.events.push("after_update");
        Ok(())
    }

    fn before_delete(&mut self) -> tusk::Result<()> {
        self.events.push("before_delete");
        Ok(())
    }

    fn after_delete(&mut self) -> tusk::Result<()> {
        self.events.push("after_delete");
        Ok(())
    }
}

/// A descriptor with no table, for construction-time validation.
pub static BROKEN: ModelInfo = ModelInfo {
    name: "Broken",
    table: "",
    primary_key: &["id"],
    columns: &[],
    parent: None,
    load: tusk::core::record::load_boxed::<Note>,
};
