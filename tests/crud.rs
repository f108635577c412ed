use common::{Admin, Author, FailingEngine, Membership, MockEngine, Note, row};
use tusk::prelude::*;

mod common;

fn note_row(id: i64, body: &str) -> Fields {
    row([
        ("note_id", id.into()),
        ("body", body.into()),
        ("created_at", "2024-05-01 10:00:00".into()),
    ])
}

#[test]
fn test_find_by_id() {
    let engine = MockEngine::new()
        .with_rows("author", vec![row([("author_id", 7.into()), ("name", "Ada".into())])]);

    let author = Author::find(&engine, 7).unwrap();
    assert_eq!(author.name().as_deref(), Some("Ada"));
    assert_eq!(
        engine.queries(),
        vec!["SELECT SQL_CALC_FOUND_ROWS `author`.* FROM `author` WHERE `author`.`author_id` = '7' LIMIT 0, 1".to_string()]
    );
}

#[test]
fn test_find_missing_is_not_found() {
    let engine = MockEngine::new();
    assert!(matches!(Author::find(&engine, 7), Err(TuskError::NotFound(_))));
}

#[test]
fn test_find_null_id_skips_engine() {
    let engine = MockEngine::new();
    assert!(matches!(
        Author::find(&engine, Value::Null),
        Err(TuskError::NotFound(_))
    ));
    assert!(matches!(Author::find(&engine, ""), Err(TuskError::NotFound(_))));
    assert!(engine.queries().is_empty());
}

#[test]
fn test_find_composite_key() {
    let engine = MockEngine::new().with_rows(
        "membership",
        vec![row([
            ("group_id", 1.into()),
            ("user_id", 9.into()),
            ("role", "owner".into()),
        ])],
    );

    let membership = Membership::find(&engine, vec![1, 9]).unwrap();
    assert_eq!(membership.role().as_deref(), Some("owner"));
    assert_eq!(membership.id(), Some(Value::List(vec![Value::Int(1), Value::Int(9)])));
    assert!(engine.queries()[0].contains(
        "WHERE (`membership`.`group_id` = '1' AND `membership`.`user_id` = '9')"
    ));

    assert!(matches!(
        Membership::find(&engine, 1),
        Err(TuskError::BuilderMisuse(_))
    ));
}

#[test]
fn test_find_inherited_record() {
    let engine = MockEngine::new().with_rows(
        "admin",
        vec![row([
            ("admin_id", 3.into()),
            ("user_id", 9.into()),
            ("level", 2.into()),
            ("email", "root@example.com".into()),
        ])],
    );

    let admin = Admin::find(&engine, 3).unwrap();
    assert_eq!(admin.level(), Some(2));
    assert_eq!(admin.get("email"), Some(&Value::from("root@example.com")));
    assert!(engine.queries()[0].contains(
        "INNER JOIN `user` ON `user`.`user_id` = `admin`.`user_id` WHERE `admin`.`admin_id` = '3'"
    ));
}

#[test]
fn test_find_all_and_first() {
    let engine = MockEngine::new().with_rows(
        "author",
        vec![
            row([("author_id", 1.into()), ("name", "Ada".into())]),
            row([("author_id", 2.into()), ("name", "Grace".into())]),
        ],
    );

    let all = Author::find_all(&engine, ("name", "LIKE", "%a%")).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all.total_records(), 2);

    let first = Author::find_first(&engine, ("name", "=", "Ada")).unwrap();
    assert_eq!(first.and_then(|a| a.author_id()), Some(1));
}

#[test]
fn test_paginate() {
    let engine = MockEngine::new();
    let pagination = Pagination::parse([
        ("page", "2"),
        ("size", "5"),
        ("order", "name,DESC"),
        ("name", "Ada"),
    ])
    .unwrap();

    Author::paginate(&engine, &pagination).unwrap();
    assert_eq!(
        engine.queries(),
        vec!["SELECT SQL_CALC_FOUND_ROWS `author`.* FROM `author` WHERE `author`.`name` = 'Ada' ORDER BY `name` DESC LIMIT 5, 5".to_string()]
    );
}

#[test]
fn test_create_strips_generated_columns_and_reloads() {
    let engine = MockEngine::new()
        .with_next_id(42)
        .with_rows("note", vec![note_row(42, "hello")]);

    let note = Note::create(
        &engine,
        row([
            ("note_id", 5.into()),
            ("body", "hello".into()),
            ("created_at", "yesterday".into()),
        ]),
    )
    .unwrap();

    let inserts = engine.inserts.borrow();
    assert_eq!(inserts.len(), 1);
    assert_eq!(inserts[0].0, "note");
    assert_eq!(inserts[0].1, row([("body", "hello".into())]));

    assert_eq!(note.id(), Some(Value::Int(42)));
    assert!(engine.queries()[0].contains("WHERE `note`.`note_id` = '42'"));
}

#[test]
fn test_create_hook_can_abort() {
    let engine = MockEngine::new();
    let err = Note::create(&engine, row([("body", "".into())])).unwrap_err();
    assert!(matches!(err, TuskError::Mapping(_)));
    assert!(engine.inserts.borrow().is_empty());
}

#[test]
fn test_create_composite_key_uses_supplied_values() {
    let engine = MockEngine::new().with_rows(
        "membership",
        vec![row([
            ("group_id", 4.into()),
            ("user_id", 2.into()),
            ("role", "member".into()),
        ])],
    );

    let created = Membership::create(
        &engine,
        row([
            ("group_id", 4.into()),
            ("user_id", 2.into()),
            ("role", "member".into()),
        ]),
    )
    .unwrap();

    assert_eq!(engine.inserts.borrow()[0].1.len(), 3);
    assert_eq!(created.group_id(), Some(4));
}

#[test]
fn test_save_updates_by_primary_key_with_hooks() {
    let engine = MockEngine::new();
    let mut note = Note::from_fields(note_row(8, "draft")).unwrap();
    note.merge(row([("body", "final".into())]));

    assert_eq!(note.save(&engine).unwrap(), 1);
    assert_eq!(note.events, vec!["before_update", "after_update"]);

    let updates = engine.updates.borrow();
    let (table, fields, filter) = &updates[0];
    assert_eq!(table, "note");
    assert_eq!(fields.get("body"), Some(&Value::from("final")));
    assert_eq!(filter, &FilterNode::binary("note_id", "=", 8));
}

#[test]
fn test_save_without_id_is_misuse() {
    let engine = MockEngine::new();
    let mut author = Author::new();
    author.set_name("nobody");
    assert!(matches!(
        author.save(&engine),
        Err(TuskError::BuilderMisuse(_))
    ));
    assert!(engine.updates.borrow().is_empty());
}

#[test]
fn test_delete_with_hooks() {
    let engine = MockEngine::new();
    let mut note = Note::from_fields(note_row(8, "bye")).unwrap();

    assert_eq!(note.delete(&engine).unwrap(), 1);
    assert_eq!(note.events, vec!["before_delete", "after_delete"]);

    let deletes = engine.deletes.borrow();
    assert_eq!(deletes[0].0, "note");
    assert_eq!(deletes[0].1, vec!["note_id".to_string()]);
    assert_eq!(deletes[0].2, vec![Value::Int(8)]);
}

#[test]
fn test_delete_composite_key() {
    let engine = MockEngine::new();
    let mut membership = Membership::new();
    membership.set_group_id(4).set_user_id(2);

    membership.delete(&engine).unwrap();
    let deletes = engine.deletes.borrow();
    assert_eq!(deletes[0].1, vec!["group_id".to_string(), "user_id".to_string()]);
    assert_eq!(deletes[0].2, vec![Value::Int(4), Value::Int(2)]);
}

#[test]
fn test_mapping_error_propagates_from_query() {
    let engine = MockEngine::new().with_rows("note", vec![row([("note_id", 1.into()), ("body", 5.into())])]);
    assert!(matches!(
        Note::find_all(&engine, None::<FilterNode>),
        Err(TuskError::Mapping(_))
    ));
}

#[test]
fn test_engine_errors_propagate_unchanged() {
    assert!(matches!(Author::find(&FailingEngine, 1), Err(TuskError::Engine(_))));
    assert!(matches!(
        Note::create(&FailingEngine, row([("body", "x".into())])),
        Err(TuskError::Engine(_))
    ));
}
