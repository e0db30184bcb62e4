//! Purpose: Render archive values for line output and JSON output.
//! Exports: `render_text`, `to_json`.
//! Role: Pure conversions from `plist::Value`; callers decide where the text goes.
//! Invariants: Strings render verbatim in text mode; reals keep a decimal point.
//! Invariants: Containers render as compact JSON.
//! Invariants: JSON conversion is total; unrepresentable reals become `null`.
use std::time::SystemTime;

use plist::Value as ArchiveValue;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn render_text(value: &ArchiveValue) -> String {
    match value {
        ArchiveValue::String(text) => text.clone(),
        ArchiveValue::Integer(int) => int.to_string(),
        ArchiveValue::Real(real) => format!("{real:?}"),
        ArchiveValue::Boolean(flag) => flag.to_string(),
        ArchiveValue::Date(date) => format_date(SystemTime::from(*date)),
        ArchiveValue::Uid(uid) => format!("Uid({})", uid.get()),
        ArchiveValue::Data(bytes) => hex(bytes),
        other => to_json(other).to_string(),
    }
}

pub fn to_json(value: &ArchiveValue) -> Value {
    match value {
        ArchiveValue::String(text) => json!(text),
        ArchiveValue::Integer(int) => match int.as_signed() {
            Some(signed) => json!(signed),
            None => json!(int.as_unsigned()),
        },
        ArchiveValue::Real(real) => serde_json::Number::from_f64(*real)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ArchiveValue::Boolean(flag) => json!(flag),
        ArchiveValue::Date(date) => json!(format_date(SystemTime::from(*date))),
        ArchiveValue::Uid(uid) => json!({ "$uid": uid.get() }),
        ArchiveValue::Data(bytes) => json!({ "$data": hex(bytes) }),
        ArchiveValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        ArchiveValue::Dictionary(dict) => {
            let mut map = Map::new();
            for (key, item) in dict.iter() {
                map.insert(key.clone(), to_json(item));
            }
            Value::Object(map)
        }
        _ => Value::Null,
    }
}

fn format_date(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-date".to_string())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::{render_text, to_json};
    use plist::{Date, Dictionary, Uid, Value as ArchiveValue};
    use serde_json::json;
    use std::time::{Duration, SystemTime};

    #[test]
    fn scalars_render_plainly() {
        assert_eq!(render_text(&ArchiveValue::String("Hello".into())), "Hello");
        assert_eq!(render_text(&ArchiveValue::Integer((-4i64).into())), "-4");
        assert_eq!(render_text(&ArchiveValue::Real(1.5)), "1.5");
        assert_eq!(render_text(&ArchiveValue::Real(1.0)), "1.0");
        assert_eq!(render_text(&ArchiveValue::Boolean(false)), "false");
        assert_eq!(render_text(&ArchiveValue::Uid(Uid::new(12))), "Uid(12)");
        assert_eq!(render_text(&ArchiveValue::Data(vec![0xde, 0xad, 0x01])), "dead01");
    }

    #[test]
    fn dates_render_as_rfc3339_utc() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let value = ArchiveValue::Date(Date::from(time));
        assert_eq!(render_text(&value), "2023-11-14T22:13:20Z");
        assert_eq!(to_json(&value), json!("2023-11-14T22:13:20Z"));
    }

    #[test]
    fn containers_convert_recursively() {
        let mut dict = Dictionary::new();
        dict.insert("NS.string".to_string(), ArchiveValue::String("hi".into()));
        dict.insert("$class".to_string(), ArchiveValue::Uid(Uid::new(3)));
        let value = ArchiveValue::Array(vec![
            ArchiveValue::Dictionary(dict),
            ArchiveValue::Real(f64::NAN),
            ArchiveValue::Data(vec![0x0f]),
        ]);

        let converted = to_json(&value);
        assert_eq!(
            converted,
            json!([{ "NS.string": "hi", "$class": { "$uid": 3 } }, null, { "$data": "0f" }])
        );
        assert_eq!(render_text(&value), converted.to_string());
    }

    #[test]
    fn large_unsigned_integers_survive() {
        let value = ArchiveValue::Integer(u64::MAX.into());
        assert_eq!(to_json(&value), json!(u64::MAX));
    }
}
