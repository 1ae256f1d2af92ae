//! Grouping policies
//!
//! A [`Grouping`] decides which durable file a record belongs to. The
//! contract: whenever `same_group(a, b)` holds, `group_name(a)` must equal
//! `group_name(b)` — the name is the filename stem for the whole group.

use chrono::{DateTime, Datelike, Utc};

/// Strategy mapping records to named persistence groups.
pub trait Grouping<E> {
    /// True if both records belong in the same durable file.
    fn same_group(&self, a: &E, b: &E) -> bool;

    /// Stable name of the group `e` belongs to; used as the filename stem.
    fn group_name(&self, e: &E) -> String;
}

/// Groups records by the calendar month of a caller-supplied timestamp.
///
/// Group names have the form `<prefix>_<YYYY>_<MM>` with a two-digit month
/// (`readings_2024_03`). An empty prefix yields bare `<YYYY>_<MM>` names.
pub struct Monthly<E> {
    prefix: String,
    date: Box<dyn Fn(&E) -> DateTime<Utc> + Send + Sync>,
}

impl<E> Monthly<E> {
    /// Create a monthly grouping over the timestamp `date` extracts.
    pub fn new(
        prefix: impl Into<String>,
        date: impl Fn(&E) -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() {
            prefix.push('_');
        }
        Monthly {
            prefix,
            date: Box::new(date),
        }
    }
}

impl<E> Grouping<E> for Monthly<E> {
    fn same_group(&self, a: &E, b: &E) -> bool {
        let da = (self.date)(a);
        let db = (self.date)(b);
        da.year() == db.year() && da.month() == db.month()
    }

    fn group_name(&self, e: &E) -> String {
        let d = (self.date)(e);
        format!("{}{}_{:02}", self.prefix, d.year(), d.month())
    }
}

/// Puts every record into one fixed-name group.
pub struct SingleGroup {
    name: String,
}

impl SingleGroup {
    /// Create a grouping whose only group is `name`.
    pub fn new(name: impl Into<String>) -> Self {
        SingleGroup { name: name.into() }
    }
}

impl<E> Grouping<E> for SingleGroup {
    fn same_group(&self, _a: &E, _b: &E) -> bool {
        true
    }

    fn group_name(&self, _e: &E) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn monthly_names_use_two_digit_months() {
        let g: Monthly<DateTime<Utc>> = Monthly::new("test", |e| *e);
        assert_eq!(g.group_name(&at(2024, 3, 14)), "test_2024_03");
        assert_eq!(g.group_name(&at(2024, 11, 2)), "test_2024_11");
    }

    #[test]
    fn monthly_empty_prefix_has_no_separator() {
        let g: Monthly<DateTime<Utc>> = Monthly::new("", |e| *e);
        assert_eq!(g.group_name(&at(1999, 1, 1)), "1999_01");
    }

    #[test]
    fn monthly_same_group_requires_year_and_month() {
        let g: Monthly<DateTime<Utc>> = Monthly::new("t", |e| *e);
        assert!(g.same_group(&at(2024, 3, 1), &at(2024, 3, 31)));
        assert!(!g.same_group(&at(2024, 3, 1), &at(2024, 4, 1)));
        assert!(!g.same_group(&at(2023, 3, 1), &at(2024, 3, 1)));
    }

    #[test]
    fn monthly_contract_same_group_implies_same_name() {
        let g: Monthly<DateTime<Utc>> = Monthly::new("t", |e| *e);
        let a = at(2024, 7, 1);
        let b = at(2024, 7, 29);
        assert!(g.same_group(&a, &b));
        assert_eq!(g.group_name(&a), g.group_name(&b));
    }

    #[test]
    fn single_group_is_one_file() {
        let g = SingleGroup::new("everything");
        assert!(g.same_group(&1, &2));
        assert_eq!(g.group_name(&1), "everything");
        assert_eq!(g.group_name(&2), "everything");
    }
}
