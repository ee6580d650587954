//! Decide whether a matched file qualifies for its entry's action.

use std::time::{Duration, SystemTime};

use common::{ActionType, Condition};

use crate::error::Result;
use crate::resolver::ResolvedFile;
use crate::units::{parse_age, parse_size};

/// Which configured threshold made a file qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Delete entry without an age condition.
    Unconditional,
    Size,
    Age,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Qualifies(Trigger),
    /// Thresholds are configured but the file is below all of them.
    NotDue,
    /// Rotate entry with neither a size nor an age condition; nothing ever rotates.
    NoTrigger,
}

impl Verdict {
    pub fn qualifies(&self) -> bool {
        matches!(self, Verdict::Qualifies(_))
    }
}

/// Evaluate `file` against an entry's action and condition at instant `now`.
///
/// Unparseable size or age values fail the evaluation of this file only.
pub fn evaluate(
    action: ActionType,
    condition: Option<&Condition>,
    file: &ResolvedFile,
    now: SystemTime,
) -> Result<Verdict> {
    match action {
        ActionType::Delete => evaluate_delete(condition, file, now),
        ActionType::Rotate => evaluate_rotate(condition, file, now),
    }
}

fn evaluate_delete(
    condition: Option<&Condition>,
    file: &ResolvedFile,
    now: SystemTime,
) -> Result<Verdict> {
    let Some(age) = condition.and_then(|c| c.age.as_deref()) else {
        return Ok(Verdict::Qualifies(Trigger::Unconditional));
    };

    let max_age = parse_age(age)?;
    if file_age(file, now) >= max_age {
        Ok(Verdict::Qualifies(Trigger::Age))
    } else {
        Ok(Verdict::NotDue)
    }
}

fn evaluate_rotate(
    condition: Option<&Condition>,
    file: &ResolvedFile,
    now: SystemTime,
) -> Result<Verdict> {
    let Some(condition) = condition else {
        return Ok(Verdict::NoTrigger);
    };

    let max_size = condition.size.as_deref().map(parse_size).transpose()?;
    let max_age = condition.age.as_deref().map(parse_age).transpose()?;

    if max_size.is_none() && max_age.is_none() {
        return Ok(Verdict::NoTrigger);
    }

    if let Some(max_size) = max_size {
        // A negative threshold is met by every file.
        let reached = u64::try_from(max_size)
            .ok()
            .is_none_or(|limit| file.size >= limit);
        if reached {
            return Ok(Verdict::Qualifies(Trigger::Size));
        }
    }

    if let Some(max_age) = max_age
        && file_age(file, now) >= max_age
    {
        return Ok(Verdict::Qualifies(Trigger::Age));
    }

    Ok(Verdict::NotDue)
}

/// Time since last modification; a timestamp in the future counts as zero.
fn file_age(file: &ResolvedFile, now: SystemTime) -> Duration {
    now.duration_since(file.modified).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::PathBuf;

    const HOUR: Duration = Duration::from_secs(3600);

    fn file(size: u64, age: Duration, now: SystemTime) -> ResolvedFile {
        ResolvedFile {
            path: PathBuf::from("/var/log/app.log"),
            size,
            modified: now - age,
        }
    }

    fn condition(size: Option<&str>, age: Option<&str>) -> Condition {
        Condition {
            size: size.map(str::to_string),
            age: age.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_delete_without_age_always_qualifies() {
        let now = SystemTime::now();
        let f = file(0, Duration::ZERO, now);

        assert_eq!(
            evaluate(ActionType::Delete, None, &f, now).unwrap(),
            Verdict::Qualifies(Trigger::Unconditional)
        );
        assert_eq!(
            evaluate(ActionType::Delete, Some(&Condition::default()), &f, now).unwrap(),
            Verdict::Qualifies(Trigger::Unconditional)
        );
    }

    #[test]
    fn test_delete_age_threshold_is_inclusive() {
        let now = SystemTime::now();
        let c = condition(None, Some("1h"));

        let old = file(0, 2 * HOUR, now);
        let exact = file(0, HOUR, now);
        let young = file(0, HOUR / 2, now);

        assert!(evaluate(ActionType::Delete, Some(&c), &old, now).unwrap().qualifies());
        assert!(evaluate(ActionType::Delete, Some(&c), &exact, now).unwrap().qualifies());
        assert_eq!(
            evaluate(ActionType::Delete, Some(&c), &young, now).unwrap(),
            Verdict::NotDue
        );
    }

    #[test]
    fn test_delete_ignores_size() {
        let now = SystemTime::now();
        let c = condition(Some("1KB"), None);
        let small = file(1, Duration::ZERO, now);

        assert_eq!(
            evaluate(ActionType::Delete, Some(&c), &small, now).unwrap(),
            Verdict::Qualifies(Trigger::Unconditional)
        );
    }

    #[test]
    fn test_rotate_size_threshold_is_inclusive() {
        let now = SystemTime::now();
        let c = condition(Some("1MB"), None);

        let exact = file(1024 * 1024, Duration::ZERO, now);
        let below = file(1024 * 1024 - 1, Duration::ZERO, now);

        assert_eq!(
            evaluate(ActionType::Rotate, Some(&c), &exact, now).unwrap(),
            Verdict::Qualifies(Trigger::Size)
        );
        assert_eq!(
            evaluate(ActionType::Rotate, Some(&c), &below, now).unwrap(),
            Verdict::NotDue
        );
    }

    #[test]
    fn test_rotate_negative_size_always_reached() {
        let now = SystemTime::now();
        let c = condition(Some("-1"), None);
        let empty = file(0, Duration::ZERO, now);

        assert_eq!(
            evaluate(ActionType::Rotate, Some(&c), &empty, now).unwrap(),
            Verdict::Qualifies(Trigger::Size)
        );
    }

    #[test]
    fn test_rotate_size_or_age() {
        let now = SystemTime::now();
        let c = condition(Some("1MB"), Some("1h"));

        let old_small = file(10, 2 * HOUR, now);
        let young_big = file(2 * 1024 * 1024, Duration::ZERO, now);
        let young_small = file(10, Duration::ZERO, now);

        assert_eq!(
            evaluate(ActionType::Rotate, Some(&c), &old_small, now).unwrap(),
            Verdict::Qualifies(Trigger::Age)
        );
        assert_eq!(
            evaluate(ActionType::Rotate, Some(&c), &young_big, now).unwrap(),
            Verdict::Qualifies(Trigger::Size)
        );
        assert_eq!(
            evaluate(ActionType::Rotate, Some(&c), &young_small, now).unwrap(),
            Verdict::NotDue
        );
    }

    #[test]
    fn test_rotate_without_triggers_never_qualifies() {
        let now = SystemTime::now();
        let huge_and_old = file(u64::MAX, 1000 * HOUR, now);
        let no_triggers = Condition {
            max_keep: Some(3),
            compress: Some(true),
            ..Default::default()
        };

        assert_eq!(
            evaluate(ActionType::Rotate, None, &huge_and_old, now).unwrap(),
            Verdict::NoTrigger
        );
        assert_eq!(
            evaluate(ActionType::Rotate, Some(&no_triggers), &huge_and_old, now).unwrap(),
            Verdict::NoTrigger
        );
    }

    #[test]
    fn test_malformed_values_fail_evaluation() {
        let now = SystemTime::now();
        let f = file(10, Duration::ZERO, now);

        let bad_size = condition(Some("lots"), Some("1h"));
        let err = evaluate(ActionType::Rotate, Some(&bad_size), &f, now).unwrap_err();
        assert!(matches!(err, Error::InvalidSize { .. }));

        let bad_age = condition(None, Some("1.5h"));
        let err = evaluate(ActionType::Delete, Some(&bad_age), &f, now).unwrap_err();
        assert!(matches!(err, Error::InvalidAge { .. }));
    }

    #[test]
    fn test_future_mtime_counts_as_fresh() {
        let now = SystemTime::now();
        let f = ResolvedFile {
            path: PathBuf::from("/var/log/app.log"),
            size: 0,
            modified: now + HOUR,
        };
        let c = condition(None, Some("1s"));

        assert_eq!(
            evaluate(ActionType::Delete, Some(&c), &f, now).unwrap(),
            Verdict::NotDue
        );
    }
}
