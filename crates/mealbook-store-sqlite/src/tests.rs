//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use mealbook_core::{
  Error as CoreError,
  bootstrap::{AdminBootstrap, BootstrapOutcome},
  identity::{Credential, Identity, NewIdentity},
  registration::{MealType, NewRegistration},
  store::{DateRange, IdentityStore, RegistrationFilter, RegistrationLedger},
  tally::daily_tally,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> Identity {
  s.create(NewIdentity::new(name, Credential::new("pw")))
    .await
    .unwrap()
}

fn jan(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, d).unwrap() }

fn temp_db_path() -> std::path::PathBuf {
  std::env::temp_dir().join(format!("mealbook-test-{}.db", Uuid::new_v4()))
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_by_username() {
  let s = store().await;
  let created = user(&s, "u1").await;

  let found = s.find_by_username("u1").await.unwrap().unwrap();
  assert_eq!(found.identity_id, created.identity_id);
  assert_eq!(found.username, "u1");
  assert_eq!(found.credential.expose(), "pw");
  assert!(!found.is_admin);
  assert!(found.lifecycle.is_active());
}

#[tokio::test]
async fn find_by_username_is_exact_and_case_sensitive() {
  let s = store().await;
  user(&s, "Alice").await;
  assert!(s.find_by_username("alice").await.unwrap().is_none());
  assert!(s.find_by_username("Alice ").await.unwrap().is_none());
  assert!(s.find_by_username("Alice").await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  user(&s, "u1").await;

  let err = s
    .create(NewIdentity::new("u1", Credential::new("other")))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::DuplicateUsername(ref n) if n == "u1"));
  assert_eq!(s.list_identities().await.unwrap().len(), 1);
}

#[tokio::test]
async fn blank_username_is_rejected() {
  let s = store().await;
  let err = s
    .create(NewIdentity::new("", Credential::new("pw")))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidUsername));
}

#[tokio::test]
async fn removed_identity_frees_its_username() {
  let s = store().await;
  let old = user(&s, "u1").await;

  s.remove_identity(old.identity_id).await.unwrap();
  s.remove_identity(old.identity_id).await.unwrap();
  assert!(s.get_identity(old.identity_id).await.unwrap().is_none());
  assert!(s.find_by_username("u1").await.unwrap().is_none());

  let new = user(&s, "u1").await;
  assert_ne!(new.identity_id, old.identity_id);
}

#[tokio::test]
async fn list_identities_orders_by_username() {
  let s = store().await;
  user(&s, "carol").await;
  user(&s, "alice").await;
  user(&s, "bob").await;

  let names: Vec<_> = s
    .list_identities()
    .await
    .unwrap()
    .into_iter()
    .map(|i| i.username)
    .collect();
  assert_eq!(names, ["alice", "bob", "carol"]);
}

#[tokio::test]
async fn set_credential_replaces_secret() {
  let s = store().await;
  let u = user(&s, "u1").await;

  let updated = s
    .set_credential(u.identity_id, Credential::new("new-secret"))
    .await
    .unwrap();
  assert_eq!(updated.credential.expose(), "new-secret");
  assert!(updated.updated_at >= u.updated_at);

  let err = s
    .set_credential(Uuid::new_v4(), Credential::new("x"))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::UnknownIdentity(_)));
}

// ─── Bootstrap ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_on_empty_store_creates_admin() {
  let s = store().await;
  let ensured = AdminBootstrap::default().ensure(&s).await.unwrap();
  assert_eq!(ensured.outcome(), BootstrapOutcome::Created);

  let admin = s.find_by_username("admin").await.unwrap().unwrap();
  assert!(admin.is_admin);

  let again = AdminBootstrap::default().ensure(&s).await.unwrap();
  assert_eq!(again.outcome(), BootstrapOutcome::AlreadyPresent);
  assert_eq!(again.admin().identity_id, admin.identity_id);
  assert_eq!(s.list_identities().await.unwrap().len(), 1);
}

#[tokio::test]
async fn bootstrap_from_two_connections_creates_one_admin() {
  let path = temp_db_path();
  let first = SqliteStore::open(&path).await.unwrap();
  let second = SqliteStore::open(&path).await.unwrap();

  let (a, b) = tokio::join!(
    async { AdminBootstrap::default().ensure(&first).await },
    async { AdminBootstrap::default().ensure(&second).await },
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_eq!(a.admin().identity_id, b.admin().identity_id);

  let admins: Vec<_> = first
    .list_identities()
    .await
    .unwrap()
    .into_iter()
    .filter(|i| i.username == "admin")
    .collect();
  assert_eq!(admins.len(), 1);

  drop((first, second));
  let _ = std::fs::remove_file(&path);
}

// ─── Registrations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_twice_replaces_the_record() {
  let s = store().await;
  let u1 = user(&s, "u1").await;

  let first = s
    .upsert(NewRegistration::new(u1.identity_id, jan(10), MealType::Breakfast, true))
    .await
    .unwrap();
  assert_eq!(first.guest_count, 0);
  assert_eq!(first.guest_company, None);

  let second = s
    .upsert(
      NewRegistration::new(u1.identity_id, jan(10), MealType::Breakfast, false)
        .with_guests(2, "Acme"),
    )
    .await
    .unwrap();
  assert_eq!(second.registration_id, first.registration_id);
  assert_eq!(second.created_at, first.created_at);

  let found = s
    .query(RegistrationFilter {
      identity_id: Some(u1.identity_id),
      date_range:  Some(DateRange::new(jan(10), jan(10))),
      meal_type:   Some(MealType::Breakfast),
    })
    .collect_all()
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert!(!found[0].participating);
  assert_eq!(found[0].guest_count, 2);
  assert_eq!(found[0].guest_company.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn clearing_guests_drops_the_company() {
  let s = store().await;
  let u1 = user(&s, "u1").await;

  s.upsert(
    NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, true).with_guests(2, "Acme"),
  )
  .await
  .unwrap();
  let cleared = s
    .upsert(
      NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, true).with_guests(0, "Acme"),
    )
    .await
    .unwrap();
  assert_eq!(cleared.guest_count, 0);
  assert_eq!(cleared.guest_company, None);
}

#[tokio::test]
async fn missing_guest_company_changes_nothing() {
  let s = store().await;
  let u1 = user(&s, "u1").await;
  let existing = s
    .upsert(NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, true))
    .await
    .unwrap();

  let err = s
    .upsert(
      NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, false).with_guests(1, ""),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::MissingGuestCompany));

  let after = s.get_registration(existing.registration_id).await.unwrap().unwrap();
  assert_eq!(after, existing);
}

#[tokio::test]
async fn negative_guest_count_is_rejected() {
  let s = store().await;
  let u1 = user(&s, "u1").await;
  let err = s
    .upsert(
      NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, true).with_guests(-2, "Acme"),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::InvalidGuestCount(-2)));
}

#[tokio::test]
async fn upsert_requires_active_identity() {
  let s = store().await;
  let unknown = Uuid::new_v4();
  let err = s
    .upsert(NewRegistration::new(unknown, jan(10), MealType::Lunch, true))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::UnknownIdentity(id) if id == unknown));

  let gone = user(&s, "gone").await;
  s.remove_identity(gone.identity_id).await.unwrap();
  let err = s
    .upsert(NewRegistration::new(gone.identity_id, jan(10), MealType::Lunch, true))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::UnknownIdentity(_)));
}

#[tokio::test]
async fn concurrent_upserts_on_one_connection_leave_one_record() {
  let s = store().await;
  let u1 = user(&s, "u1").await;

  let handles: Vec<_> = (0..10)
    .map(|i| {
      let s = s.clone();
      let id = u1.identity_id;
      tokio::spawn(async move {
        s.upsert(NewRegistration::new(id, jan(10), MealType::Lunch, i % 2 == 0))
          .await
      })
    })
    .collect();
  for h in handles {
    h.await.unwrap().unwrap();
  }

  let all = s.query(RegistrationFilter::default()).collect_all().await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn concurrent_upserts_from_many_connections_leave_one_record() {
  let path = temp_db_path();
  let mut stores = Vec::new();
  for _ in 0..12 {
    stores.push(SqliteStore::open(&path).await.unwrap());
  }
  let u1 = user(&stores[0], "u1").await;

  let handles: Vec<_> = stores
    .iter()
    .cloned()
    .enumerate()
    .map(|(i, s)| {
      let id = u1.identity_id;
      tokio::spawn(async move {
        s.upsert(
          NewRegistration::new(id, jan(10), MealType::Lunch, i % 2 == 0)
            .with_guests(i as i64, "Acme"),
        )
        .await
      })
    })
    .collect();
  let mut ids = Vec::new();
  for h in handles {
    ids.push(h.await.unwrap().unwrap().registration_id);
  }

  let all = stores[0]
    .query(RegistrationFilter::default())
    .collect_all()
    .await
    .unwrap();
  assert_eq!(all.len(), 1);
  assert!(ids.iter().all(|id| *id == all[0].registration_id));

  drop(stores);
  let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn upsert_rejects_dates_past_four_digit_years() {
  let s = store().await;
  let u1 = user(&s, "u1").await;
  let err = s
    .upsert(NewRegistration::new(u1.identity_id, NaiveDate::MAX, MealType::Lunch, true))
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::DateOutOfRange(_)));
  assert!(s.query(RegistrationFilter::default()).collect_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_is_idempotent() {
  let s = store().await;
  let u1 = user(&s, "u1").await;
  let r = s
    .upsert(NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, true))
    .await
    .unwrap();

  s.remove(r.registration_id).await.unwrap();
  s.remove(r.registration_id).await.unwrap();
  s.remove(Uuid::new_v4()).await.unwrap();

  assert!(s.get_registration(r.registration_id).await.unwrap().is_none());
  let all = s.query(RegistrationFilter::default()).collect_all().await.unwrap();
  assert!(all.is_empty());

  // The key is free again and gets a new record.
  let again = s
    .upsert(NewRegistration::new(u1.identity_id, jan(10), MealType::Lunch, false))
    .await
    .unwrap();
  assert_ne!(again.registration_id, r.registration_id);
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_orders_by_date_then_meal_across_pages() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;

  for d in [12, 10, 11] {
    for meal in [MealType::Lunch, MealType::Breakfast] {
      for who in [&a, &b] {
        s.upsert(NewRegistration::new(who.identity_id, jan(d), meal, true))
          .await
          .unwrap();
      }
    }
  }

  let mut pager = s.query(RegistrationFilter::default()).page_size(5);
  let mut seen = Vec::new();
  while let Some(r) = pager.next().await.unwrap() {
    seen.push(r);
  }
  assert_eq!(seen.len(), 12);
  assert!(seen.windows(2).all(|w| {
    (w[0].date, w[0].meal_type, w[0].registration_id)
      < (w[1].date, w[1].meal_type, w[1].registration_id)
  }));
  assert_eq!((seen[0].date, seen[0].meal_type), (jan(10), MealType::Breakfast));
  assert_eq!((seen[2].date, seen[2].meal_type), (jan(10), MealType::Lunch));

  // Restarting yields the same sequence from the top.
  let fresh = s.query(RegistrationFilter::default()).collect_all().await.unwrap();
  let ids: Vec<_> = fresh.iter().map(|r| r.registration_id).collect();
  let seen_ids: Vec<_> = seen.iter().map(|r| r.registration_id).collect();
  assert_eq!(ids, seen_ids);
}

#[tokio::test]
async fn query_filters_combine() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;
  for d in 8..=12 {
    s.upsert(NewRegistration::new(a.identity_id, jan(d), MealType::Lunch, true))
      .await
      .unwrap();
    s.upsert(NewRegistration::new(b.identity_id, jan(d), MealType::Lunch, true))
      .await
      .unwrap();
    s.upsert(NewRegistration::new(a.identity_id, jan(d), MealType::Breakfast, true))
      .await
      .unwrap();
  }

  let hits = s
    .query(RegistrationFilter {
      identity_id: Some(a.identity_id),
      date_range:  Some(DateRange::new(jan(9), jan(11))),
      meal_type:   Some(MealType::Lunch),
    })
    .collect_all()
    .await
    .unwrap();
  assert_eq!(hits.len(), 3);
  assert!(hits.iter().all(|r| r.identity_id == a.identity_id && r.meal_type == MealType::Lunch));
  assert_eq!(hits.first().unwrap().date, jan(9));
  assert_eq!(hits.last().unwrap().date, jan(11));
}

#[tokio::test]
async fn tally_counts_one_day() {
  let s = store().await;
  let a = user(&s, "a").await;
  let b = user(&s, "b").await;
  s.upsert(NewRegistration::new(a.identity_id, jan(10), MealType::Lunch, true).with_guests(2, "Acme"))
    .await
    .unwrap();
  s.upsert(NewRegistration::new(b.identity_id, jan(10), MealType::Lunch, false))
    .await
    .unwrap();
  s.upsert(NewRegistration::new(b.identity_id, jan(11), MealType::Lunch, true))
    .await
    .unwrap();

  let tally = daily_tally(&s, jan(10)).await.unwrap();
  let lunch = tally.meal(MealType::Lunch).unwrap();
  assert_eq!((lunch.attending, lunch.abstaining, lunch.guests), (1, 1, 2));
  let breakfast = tally.meal(MealType::Breakfast).unwrap();
  assert_eq!(breakfast.attending + breakfast.abstaining, 0);
}

#[tokio::test]
async fn open_ended_ranges_match_one_side() {
  let s = store().await;
  let u1 = user(&s, "u1").await;
  for d in 9..=12 {
    s.upsert(NewRegistration::new(u1.identity_id, jan(d), MealType::Lunch, true))
      .await
      .unwrap();
  }

  let dates = |range: DateRange| {
    let s = s.clone();
    async move {
      s.query(RegistrationFilter { date_range: Some(range), ..Default::default() })
        .collect_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.date)
        .collect::<Vec<_>>()
    }
  };

  assert_eq!(dates(DateRange::starting(jan(11))).await, vec![jan(11), jan(12)]);
  assert_eq!(dates(DateRange::until(jan(10))).await, vec![jan(9), jan(10)]);
  assert_eq!(dates(DateRange::new(jan(11), NaiveDate::MAX)).await, vec![jan(11), jan(12)]);
  assert_eq!(dates(DateRange::new(NaiveDate::MIN, jan(9))).await, vec![jan(9)]);
  assert!(dates(DateRange::starting(NaiveDate::MAX)).await.is_empty());
  assert!(dates(DateRange::until(NaiveDate::MIN)).await.is_empty());
}
