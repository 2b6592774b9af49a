pub mod meal_store;

pub use meal_store::{MealRecord, MealRecordStore, MealStatus, SqliteMealStore, StoreError};
