//! Integration tests for editor crate

use cord_editor::{
    compute_change_request_inverse, create_change_request, fields, key_between, should_accept,
    ChangePayload, ContentSection, Document, EditSession, EntityKind, ManualClock,
    ProjectContents, RemoteChangeKind, RemoteOutcome, RequestFactory, StoredChangeRequest,
    Timestamp, Value,
};
use std::sync::Arc;

fn project() -> ProjectContents {
    ProjectContents::new()
        .with_section(
            EntityKind::Project,
            ContentSection::from_documents([Document::new("p1", EntityKind::Project)]),
        )
        .with_section(
            EntityKind::Element,
            ContentSection::from_documents([Document::new("root", EntityKind::Element)]),
        )
}

fn child(id: &str, index: &str) -> Document {
    Document::new(id, EntityKind::Element)
        .with(fields::PARENT_ID, "root")
        .with(fields::FRACTIONAL_INDEX, index)
}

fn children(contents: &ProjectContents) -> Vec<String> {
    contents
        .get(EntityKind::Element, "root")
        .map(Document::child_ids)
        .unwrap_or_default()
}

#[test]
fn test_request_lifecycle() -> anyhow::Result<()> {
    let clock = ManualClock::new(Timestamp::new(1_000, 0));
    let mut contents = project();

    let first = key_between(None, None)?;
    let second = key_between(Some(&first), None)?;
    let request = create_change_request(
        "alice",
        "p1",
        vec![ChangePayload::new(EntityKind::Element)
            .set(child("b", &second))
            .set(child("a", &first))],
        &clock,
    )?;

    assert!(should_accept(&request, &contents));
    let report = contents.apply_change_request(&request)?;

    assert_eq!(children(&contents), vec!["a".to_string(), "b".to_string()]);
    let elements = report.section(EntityKind::Element).unwrap();
    assert!(elements.updated.contains("root"));
    assert_eq!(elements.created.len(), 2);

    // Replaying the same request is refused: the documents carry its marker
    assert!(!should_accept(&request, &contents));
    Ok(())
}

#[test]
fn test_inverse_request_restores_snapshot() -> anyhow::Result<()> {
    let clock = ManualClock::new(Timestamp::new(1_000, 0));
    let mut contents = project();
    let setup = create_change_request(
        "alice",
        "p1",
        vec![ChangePayload::new(EntityKind::Element)
            .set(child("a", "V").with(fields::STYLE, Value::object([("width", Value::from(10))])))],
        &clock,
    )?;
    contents.apply_change_request(&setup)?;
    let before = contents.clone();

    let edit = create_change_request(
        "alice",
        "p1",
        vec![
            ChangePayload::new(EntityKind::Element)
                .update(
                    "a",
                    Value::object([("style", Value::object([("width", Value::Null)]))]),
                )
                .set(child("b", "l")),
            ChangePayload::new(EntityKind::Asset)
                .set(Document::new("logo", EntityKind::Asset).with("url", "logo.svg")),
        ],
        &clock,
    )?;
    let inverse = compute_change_request_inverse(&edit, &contents, &clock)?;
    contents.apply_change_request(&edit)?;
    assert_eq!(children(&contents), vec!["a".to_string(), "b".to_string()]);

    // Undo replays inverse payloads in reverse order
    let mut undo = inverse.clone();
    let bump = undo.payload.pop();
    undo.payload.reverse();
    undo.payload.extend(bump);
    contents.apply_change_request(&undo)?;

    assert_eq!(children(&contents), vec!["a".to_string()]);
    assert!(contents.get(EntityKind::Element, "b").is_none());
    assert!(contents.get(EntityKind::Asset, "logo").is_none());

    let a = contents.get(EntityKind::Element, "a").unwrap();
    let a_before = before.get(EntityKind::Element, "a").unwrap();
    assert_eq!(a.get(fields::STYLE), a_before.get(fields::STYLE));
    Ok(())
}

#[test]
fn test_stored_request_applies_like_the_original() -> anyhow::Result<()> {
    let clock = ManualClock::new(Timestamp::new(1_000, 0));
    let request = create_change_request(
        "alice",
        "p1",
        vec![ChangePayload::new(EntityKind::Element).set(child("a", "V"))],
        &clock,
    )?;

    let json = serde_json::to_string(&request.to_storage())?;
    let stored: StoredChangeRequest = serde_json::from_str(&json)?;

    let mut direct = project();
    direct.apply_change_request(&request)?;
    let mut replayed = project();
    replayed.apply_change_request(&stored.into_request())?;

    assert_eq!(direct, replayed);
    Ok(())
}

#[test]
fn test_two_sessions_converge() -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::new(Timestamp::new(1_000, 0)));
    let mut alice = EditSession::new(
        "alice-tab",
        RequestFactory::new("alice", "p1", clock.clone()),
        project(),
    );
    let mut bob = EditSession::new("bob-tab", RequestFactory::new("bob", "p1", clock), project());

    let from_alice = alice.apply_local(vec![
        ChangePayload::new(EntityKind::Element).set(child("a", "V"))
    ])?;
    let from_bob = bob.apply_local(vec![
        ChangePayload::new(EntityKind::Element).set(child("b", "G"))
    ])?;

    // The store echoes both requests to both clients in commit order
    for request in [&from_alice, &from_bob] {
        alice.receive_remote(request, RemoteChangeKind::Added)?;
        bob.receive_remote(request, RemoteChangeKind::Added)?;
    }

    assert_eq!(alice.pending_count(), 0);
    assert_eq!(bob.pending_count(), 0);
    assert_eq!(children(alice.contents()), vec!["b".to_string(), "a".to_string()]);
    assert_eq!(children(alice.contents()), children(bob.contents()));
    Ok(())
}

#[test]
fn test_stale_remote_update_loses() -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::new(Timestamp::new(1_000, 0)));
    let mut session = EditSession::new(
        "tab",
        RequestFactory::new("alice", "p1", clock.clone()),
        project(),
    );
    session.apply_local(vec![ChangePayload::new(EntityKind::Element).set(child("a", "V"))])?;

    let stale = create_change_request(
        "bob",
        "p1",
        vec![ChangePayload::new(EntityKind::Element)
            .update("a", Value::object([(fields::NAME, Value::from("Old"))]))],
        &ManualClock::new(Timestamp::new(1, 0)),
    )?;

    let outcome = session.receive_remote(&stale, RemoteChangeKind::Added)?;
    assert!(matches!(outcome, RemoteOutcome::Rejected(_)));
    let a = session.contents().get(EntityKind::Element, "a").unwrap();
    assert_eq!(a.get(fields::NAME), None);
    Ok(())
}
