//! Test fixtures and helpers.
//!
//! Random user records and the date-keyed records used to check predicate
//! deletes.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use simple_storage_core::{Key, Record};

/// Names given to random users.
pub const NAMES: [&str; 23] = [
    "Авдотья",
    "Агафия",
    "Иоанна",
    "Лукия",
    "Макария",
    "Миропия",
    "Патрикия",
    "Агап",
    "Анастасий",
    "Викентий",
    "Герасим",
    "Евдоким",
    "Ефрем",
    "Исаакий",
    "Зиновий",
    "Лаврентий",
    "Макарий",
    "Никодим",
    "Орест",
    "Пахом",
    "Устин",
    "Федот",
    "Фома",
];

/// URL carried by every random user.
pub const URL: &str = "example.org";

/// Keys of the date-keyed fixture, in ascending order.
pub const DATE_KEYS: [&str; 6] = [
    "2004-12-30",
    "2004-12-31",
    "2005-01-01",
    "2005-01-02",
    "2005-01-03",
    "2005-01-04",
];

/// How many date-keyed records survive [`day_digit_predicate`].
pub const DATE_SURVIVORS: usize = 4;

/// A random ten-digit number.
pub fn random_id(rng: &mut impl Rng) -> i64 {
    rng.gen_range(1_000_000_000..=9_999_999_999)
}

/// A user record with a random ten-digit id, stored either as an integer
/// or as its decimal string, and a random name.
pub fn random_record(rng: &mut impl Rng) -> Record {
    let id = random_id(rng);
    let id = if rng.gen() {
        Value::from(id)
    } else {
        Value::from(id.to_string())
    };
    let name = NAMES.choose(rng).copied().unwrap_or(NAMES[0]);

    Record::new()
        .with("id", id)
        .with("name", name)
        .with("url", URL)
}

/// `count` random records with distinct keys.
pub fn random_records(rng: &mut impl Rng, count: usize) -> Vec<Record> {
    let mut records: Vec<Record> = Vec::with_capacity(count);
    let mut keys = std::collections::HashSet::new();
    while records.len() < count {
        let record = random_record(rng);
        if let Some(key) = record.get("id").and_then(Key::from_value) {
            if keys.insert(key) {
                records.push(record);
            }
        }
    }
    records
}

/// The key of a record built by this module.
pub fn key_of(record: &Record) -> Key {
    record
        .get("id")
        .and_then(Key::from_value)
        .unwrap_or_else(|| panic!("fixture record without id: {:?}", record))
}

/// Records keyed `2004-12-30` through `2005-01-04`.
pub fn date_records() -> Vec<Record> {
    DATE_KEYS
        .iter()
        .map(|day| Record::new().with("id", *day))
        .collect()
}

/// True when the fourth character of the id sorts below `'5'`, i.e. for
/// the two 2004 dates.
pub fn day_digit_predicate(record: &Record) -> bool {
    record.str_field("id").and_then(|id| id.chars().nth(3)) < Some('5')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_record_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let record = random_record(&mut rng);
            let id = key_of(&record);
            match id {
                Key::Integer(i) => assert!((1_000_000_000..=9_999_999_999).contains(&i)),
                Key::Text(s) => assert_eq!(s.len(), 10),
            }
            assert!(NAMES.contains(&record.str_field("name").unwrap()));
            assert_eq!(record.str_field("url"), Some(URL));
        }
    }

    #[test]
    fn test_random_records_have_distinct_keys() {
        let mut rng = StdRng::seed_from_u64(11);
        let records = random_records(&mut rng, 50);
        let keys: std::collections::HashSet<_> = records.iter().map(key_of).collect();
        assert_eq!(keys.len(), 50);
    }

    #[test]
    fn test_day_digit_predicate() {
        let matched = date_records()
            .iter()
            .filter(|r| day_digit_predicate(r))
            .count();
        assert_eq!(matched, DATE_KEYS.len() - DATE_SURVIVORS);
    }
}
