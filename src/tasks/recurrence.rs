use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// How a recurring task projects its next occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily,
    Weekly,
    Monthly,
    /// `[mon,wed,fri]`
    Weekdays(Vec<Weekday>),
    /// Anything else; scheduled like `Daily` but kept verbatim
    Other(String),
}

impl RecurrenceRule {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "daily" => return Self::Daily,
            "weekly" => return Self::Weekly,
            "monthly" => return Self::Monthly,
            _ => {}
        }

        if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let mut days: Vec<Weekday> = inner
                .split(',')
                .filter_map(|d| d.trim().parse::<Weekday>().ok())
                .collect();
            days.sort_by_key(|d| d.num_days_from_monday());
            days.dedup();
            if !days.is_empty() {
                return Self::Weekdays(days);
            }
        }

        Self::Other(trimmed.to_string())
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Weekdays(days) => {
                let names: Vec<String> =
                    days.iter().map(|d| d.to_string().to_lowercase()).collect();
                write!(f, "[{}]", names.join(","))
            }
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

impl Serialize for RecurrenceRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecurrenceRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Same day number in the following month. Days past the end of that month roll
/// over into the month after (Jan 31 -> Mar 2 in a leap year).
fn add_month_unclamped(from: NaiveDate) -> Option<NaiveDate> {
    from.with_day(1)?
        .checked_add_months(Months::new(1))?
        .checked_add_days(Days::new(u64::from(from.day0())))
}

/// One unchecked step of the rule; always lands at least one day after `from`.
fn step(rule: &RecurrenceRule, from: NaiveDate) -> NaiveDate {
    let next = match rule {
        RecurrenceRule::Daily | RecurrenceRule::Other(_) => from.checked_add_days(Days::new(1)),
        RecurrenceRule::Weekly => from.checked_add_days(Days::new(7)),
        RecurrenceRule::Monthly => add_month_unclamped(from),
        RecurrenceRule::Weekdays(days) => (1..=7)
            .filter_map(|offset| from.checked_add_days(Days::new(offset)))
            .find(|candidate| days.contains(&candidate.weekday())),
    };
    next.or_else(|| from.succ_opt()).unwrap_or(from)
}

/// Next occurrence of `rule` strictly after `from`.
pub fn next_occurrence(rule: &RecurrenceRule, from: NaiveDate) -> NaiveDate {
    let next = step(rule, from);
    if next > from || next == NaiveDate::MAX {
        next
    } else {
        next_occurrence(rule, from.succ_opt().unwrap_or(NaiveDate::MAX))
    }
}
