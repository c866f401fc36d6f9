mod helpers;

use chrono::{Duration, Utc};
use helpers::{seed_account, test_db};
use precedent::auth::keys::{import_key, issue_key, revoke_key, verify_key};
use precedent::auth::AuthError;

#[test]
fn issued_key_verifies_to_its_identity() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "alice", "Agents");

    let issued = issue_key(&conn, &user_id, &project_id, None).unwrap();
    let identity = verify_key(&conn, &issued.secret).unwrap();

    assert_eq!(identity.user_id, user_id);
    assert_eq!(identity.project_id, project_id);
}

#[test]
fn verify_resolves_the_right_key_among_many() {
    let mut conn = test_db();
    let (alice, alice_project) = seed_account(&mut conn, "alice", "A");
    let (bob, bob_project) = seed_account(&mut conn, "bob", "B");

    let alice_key = issue_key(&conn, &alice, &alice_project, None).unwrap();
    let bob_key = issue_key(&conn, &bob, &bob_project, None).unwrap();

    assert_eq!(verify_key(&conn, &alice_key.secret).unwrap().user_id, alice);
    assert_eq!(verify_key(&conn, &bob_key.secret).unwrap().user_id, bob);
    assert_eq!(
        verify_key(&conn, &bob_key.secret).unwrap().project_id,
        bob_project
    );
}

#[test]
fn issue_then_revoke_scenario() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "alice", "Agents");

    // issue key K; verify(K) succeeds
    let k = issue_key(&conn, &user_id, &project_id, None).unwrap();
    let identity = verify_key(&conn, &k.secret).unwrap();
    assert_eq!(identity.user_id, user_id);
    assert_eq!(identity.project_id, project_id);

    // revoke K; verify(K) fails
    assert!(revoke_key(&conn, &k.id).unwrap());
    assert!(matches!(
        verify_key(&conn, &k.secret),
        Err(AuthError::InvalidCredential)
    ));
}

#[test]
fn revoking_one_of_two_keys_is_independent() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "alice", "Agents");

    let first = issue_key(&conn, &user_id, &project_id, None).unwrap();
    let second = issue_key(&conn, &user_id, &project_id, None).unwrap();
    revoke_key(&conn, &first.id).unwrap();

    assert!(verify_key(&conn, &first.secret).is_err());
    assert!(verify_key(&conn, &second.secret).is_ok());
}

#[test]
fn expired_key_fails_like_a_wrong_key() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "alice", "Agents");

    let expired = issue_key(
        &conn,
        &user_id,
        &project_id,
        Some(Utc::now() - Duration::minutes(5)),
    )
    .unwrap();

    // Same opaque error as a never-issued secret
    let expired_err = verify_key(&conn, &expired.secret).unwrap_err();
    let unknown_err = verify_key(&conn, "pk_no-such-key").unwrap_err();
    assert_eq!(expired_err.to_string(), unknown_err.to_string());
}

#[test]
fn never_issued_secret_always_fails() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "alice", "Agents");
    issue_key(&conn, &user_id, &project_id, None).unwrap();

    for junk in ["", "TEST", "pk_", "Bearer pk_x", "pk_aaaaaaaaaaaaaaaaaaaa"] {
        assert!(
            matches!(verify_key(&conn, junk), Err(AuthError::InvalidCredential)),
            "expected InvalidCredential for {junk:?}"
        );
    }
}

#[test]
fn imported_secret_verifies() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "dev", "Test Project");

    import_key(&conn, &user_id, &project_id, "TEST").unwrap();

    let identity = verify_key(&conn, "TEST").unwrap();
    assert_eq!(identity.user_id, user_id);
}

#[test]
fn deleting_the_project_cascades_its_keys() {
    let mut conn = test_db();
    let (user_id, project_id) = seed_account(&mut conn, "alice", "Doomed");
    let key = issue_key(&conn, &user_id, &project_id, None).unwrap();

    precedent::projects::delete_project(&conn, &project_id, &user_id)
        .unwrap()
        .unwrap();

    assert!(matches!(
        verify_key(&conn, &key.secret),
        Err(AuthError::InvalidCredential)
    ));
}
