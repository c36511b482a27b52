use parcel_core::db::open_db_in_memory;
use parcel_core::{
    OpContext, Parcel, ParcelRepository, ParcelStatus, RepoError, SqliteParcelRepository,
    DEFAULT_OP_TIMEOUT,
};

fn ctx() -> OpContext {
    OpContext::with_timeout(DEFAULT_OP_TIMEOUT)
}

fn test_parcel() -> Parcel {
    Parcel::with_created_at(1000, "test", "2024-03-01T10:15:00Z")
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let mut parcel = test_parcel();
    let number = repo.create(&ctx(), &parcel).unwrap();
    assert!(number > 0);
    parcel.number = number;

    let loaded = repo.get(&ctx(), number).unwrap();
    assert_eq!(loaded, parcel);
}

#[test]
fn create_forces_registered_status() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let mut parcel = test_parcel();
    parcel.status = ParcelStatus::Delivered;
    let number = repo.create(&ctx(), &parcel).unwrap();

    let loaded = repo.get(&ctx(), number).unwrap();
    assert_eq!(loaded.status, ParcelStatus::Registered);
    assert_eq!(loaded.address, "test");
}

#[test]
fn numbers_are_not_reused_after_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let first = repo.create(&ctx(), &test_parcel()).unwrap();
    repo.delete(&ctx(), first).unwrap();
    let second = repo.create(&ctx(), &test_parcel()).unwrap();

    assert!(second > first);
}

#[test]
fn get_missing_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let err = repo.get(&ctx(), 4242).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(4242)));
}

#[test]
fn delete_registered_then_get_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let number = repo.create(&ctx(), &test_parcel()).unwrap();
    repo.delete(&ctx(), number).unwrap();

    let err = repo.get(&ctx(), number).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == number));
}

#[test]
fn delete_after_sent_is_rejected_and_parcel_survives() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let number = repo.create(&ctx(), &test_parcel()).unwrap();
    repo.set_status(&ctx(), number, &ParcelStatus::Sent).unwrap();
    let before = repo.get(&ctx(), number).unwrap();

    let err = repo.delete(&ctx(), number).unwrap_err();
    assert!(matches!(err, RepoError::NoRowsDeleted(id) if id == number));

    let after = repo.get(&ctx(), number).unwrap();
    assert_eq!(after, before);
}

#[test]
fn delete_missing_is_indistinguishable_from_wrong_status() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let err = repo.delete(&ctx(), 99).unwrap_err();
    assert!(matches!(err, RepoError::NoRowsDeleted(99)));
}

#[test]
fn set_address_while_registered_updates_address() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let number = repo.create(&ctx(), &test_parcel()).unwrap();
    repo.set_address(&ctx(), number, "new test address").unwrap();

    let loaded = repo.get(&ctx(), number).unwrap();
    assert_eq!(loaded.address, "new test address");
}

#[test]
fn set_address_after_sent_is_rejected_and_address_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let parcel = test_parcel();
    let number = repo.create(&ctx(), &parcel).unwrap();
    repo.set_status(&ctx(), number, &ParcelStatus::Sent).unwrap();

    let err = repo
        .set_address(&ctx(), number, "new test address")
        .unwrap_err();
    assert!(matches!(err, RepoError::NoRowsUpdated(id) if id == number));

    let loaded = repo.get(&ctx(), number).unwrap();
    assert_eq!(loaded.address, parcel.address);
}

#[test]
fn set_address_missing_returns_no_rows_updated() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let err = repo.set_address(&ctx(), 77, "anywhere").unwrap_err();
    assert!(matches!(err, RepoError::NoRowsUpdated(77)));
}

#[test]
fn set_status_updates_registered_parcel() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let number = repo.create(&ctx(), &test_parcel()).unwrap();
    repo.set_status(&ctx(), number, &ParcelStatus::Sent).unwrap();

    let loaded = repo.get(&ctx(), number).unwrap();
    assert_eq!(loaded.status, ParcelStatus::Sent);
}

#[test]
fn set_status_accepts_any_value_in_any_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let number = repo.create(&ctx(), &test_parcel()).unwrap();
    repo.set_status(&ctx(), number, &ParcelStatus::Delivered)
        .unwrap();
    repo.set_status(&ctx(), number, &ParcelStatus::Sent).unwrap();
    let custom = ParcelStatus::from("lost_in_transit");
    repo.set_status(&ctx(), number, &custom).unwrap();

    let loaded = repo.get(&ctx(), number).unwrap();
    assert_eq!(loaded.status, custom);
}

#[test]
fn set_status_missing_returns_no_rows_updated() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let err = repo
        .set_status(&ctx(), 31337, &ParcelStatus::Sent)
        .unwrap_err();
    assert!(matches!(err, RepoError::NoRowsUpdated(31337)));
}

#[test]
fn list_by_client_returns_exactly_that_clients_parcels() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let client = 5_550_123;
    let mut expected = Vec::new();
    for address in ["north", "south", "east"] {
        let mut parcel = Parcel::with_created_at(client, address, "2024-03-01T10:15:00Z");
        parcel.number = repo.create(&ctx(), &parcel).unwrap();
        expected.push(parcel);
    }
    repo.create(&ctx(), &Parcel::new(client + 1, "elsewhere"))
        .unwrap();

    let mut stored = repo.list_by_client(&ctx(), client).unwrap();
    assert_eq!(stored.len(), expected.len());

    stored.sort_by_key(|parcel| parcel.number);
    expected.sort_by_key(|parcel| parcel.number);
    assert_eq!(stored, expected);
}

#[test]
fn list_by_unknown_client_is_empty() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();
    repo.create(&ctx(), &test_parcel()).unwrap();

    let stored = repo.list_by_client(&ctx(), 1).unwrap();
    assert!(stored.is_empty());
}

#[test]
fn empty_status_is_stored_and_read_back() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let number = repo.create(&ctx(), &test_parcel()).unwrap();
    let blank = ParcelStatus::Other(String::new());
    repo.set_status(&ctx(), number, &blank).unwrap();

    assert_eq!(repo.get(&ctx(), number).unwrap().status, blank);
    let listed = repo.list_by_client(&ctx(), 1000).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, blank);
}

#[test]
fn list_by_client_fails_on_undecodable_row_without_partial_result() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    repo.create(&ctx(), &test_parcel()).unwrap();
    let broken = repo.create(&ctx(), &test_parcel()).unwrap();
    conn.execute(
        "UPDATE parcel SET created_at = X'00FF' WHERE number = ?1;",
        [broken],
    )
    .unwrap();

    let err = repo.list_by_client(&ctx(), 1000).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn values_are_bound_not_interpolated() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();

    let hostile = "x'; DROP TABLE parcel; --";
    let number = repo
        .create(&ctx(), &Parcel::with_created_at(1, hostile, "2024-03-01T10:15:00Z"))
        .unwrap();

    assert_eq!(repo.get(&ctx(), number).unwrap().address, hostile);
}
