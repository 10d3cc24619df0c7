//! Per-meal headcount for a single day, computed from the ledger.

use chrono::NaiveDate;
use serde::Serialize;
use strum::IntoEnumIterator as _;

use crate::{
  Result,
  registration::MealType,
  store::{DateRange, RegistrationFilter, RegistrationLedger},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MealTally {
  pub meal_type:  MealType,
  pub attending:  u32,
  pub abstaining: u32,
  /// Guest meals across all registrations, attending or not.
  pub guests:     u32,
}

impl MealTally {
  fn empty(meal_type: MealType) -> Self {
    Self { meal_type, attending: 0, abstaining: 0, guests: 0 }
  }

  /// Meals the kitchen has to prepare.
  pub fn total_meals(&self) -> u32 { self.attending.saturating_add(self.guests) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTally {
  pub date:  NaiveDate,
  /// One entry per meal type, breakfast first.
  pub meals: Vec<MealTally>,
}

impl DailyTally {
  pub fn meal(&self, meal_type: MealType) -> Option<&MealTally> {
    self.meals.iter().find(|m| m.meal_type == meal_type)
  }
}

/// Count every active registration on `date`.
pub async fn daily_tally<L: RegistrationLedger>(
  ledger: &L,
  date: NaiveDate,
) -> Result<DailyTally> {
  let mut meals: Vec<MealTally> = MealType::iter().map(MealTally::empty).collect();

  let mut pager = ledger.query(RegistrationFilter {
    date_range: Some(DateRange::day(date)),
    ..Default::default()
  });
  while let Some(r) = pager.next().await? {
    let Some(entry) = meals.iter_mut().find(|m| m.meal_type == r.meal_type) else {
      continue;
    };
    if r.participating {
      entry.attending = entry.attending.saturating_add(1);
    } else {
      entry.abstaining = entry.abstaining.saturating_add(1);
    }
    entry.guests = entry.guests.saturating_add(r.guest_count);
  }

  Ok(DailyTally { date, meals })
}
