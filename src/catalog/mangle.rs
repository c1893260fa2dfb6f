//! Collection Name Mangling
//!
//! Entity-set names must be plain identifiers: ASCII letters, digits and
//! `_`, never starting with `_`. InfluxDB allows nearly anything, so every
//! (database, measurement) pair is mapped to a collection id and back:
//!
//! ```text
//! ("testdb", "Testing 123")   ↔  testdb__Testing_s123
//! ("_internal", "runtime")    ↔  internal__runtime
//! ("_scratch", "cpu-load")    ↔  U_uscratch__cpu_dload
//! ("metrics_", "a_sp_b")      ↔  metrics_u__a_usp_ub
//! ```
//!
//! Every `_` inside a mangled component starts a two-character escape, so a
//! component never contains `__` and never ends in `_`; the first `__` of an
//! id is always the separator. The only ids that decode to a different pair
//! are those of a raw `internal` database, which shares the alias of
//! `_internal`.

/// Joins the database and measurement components of a collection id
pub const SEPARATOR: &str = "__";

const INTERNAL_DB: &str = "_internal";
const INTERNAL_ALIAS: &str = "internal";

/// Prefixed to a mangled database name starting with `_` or with itself
const DB_PREFIX: char = 'U';

const ESCAPE: char = '_';

/// Escape code for any character without a dedicated one, followed by six
/// lowercase hex digits
const HEX_CODE: char = 'x';
const HEX_WIDTH: usize = 6;

const CODES: &[(char, char)] = &[
    ('_', 'u'),
    (' ', 's'),
    ('-', 'd'),
    ('.', 'p'),
    ('/', 'l'),
];

/// Mangle a database name
pub fn mangle_db_name(db_name: &str) -> String {
    if db_name == INTERNAL_DB {
        return INTERNAL_ALIAS.to_string();
    }

    let body = escape(db_name);
    if body.starts_with(ESCAPE) || body.starts_with(DB_PREFIX) {
        format!("{}{}", DB_PREFIX, body)
    } else {
        body
    }
}

/// Reverse of [`mangle_db_name`]
///
/// `None` when `mangled` isn't something [`mangle_db_name`] produces.
pub fn unmangle_db_name(mangled: &str) -> Option<String> {
    if mangled == INTERNAL_ALIAS {
        return Some(INTERNAL_DB.to_string());
    }

    match mangled.strip_prefix(DB_PREFIX) {
        Some(body) if body.starts_with(ESCAPE) || body.starts_with(DB_PREFIX) => unescape(body),
        Some(_) => None,
        None => unescape(mangled),
    }
}

/// Mangle a measurement name
pub fn mangle_measurement_name(measurement: &str) -> String {
    escape(measurement)
}

/// Reverse of [`mangle_measurement_name`]
pub fn unmangle_measurement_name(mangled: &str) -> Option<String> {
    unescape(mangled)
}

/// Collection id for a (database, measurement) pair
pub fn mangle(db_name: &str, measurement: &str) -> String {
    format!(
        "{}{}{}",
        mangle_db_name(db_name),
        SEPARATOR,
        mangle_measurement_name(measurement)
    )
}

/// Split a collection id back into its raw (database, measurement) pair
///
/// Returns `None` when the id has no separator or holds a malformed escape.
pub fn unmangle(id: &str) -> Option<(String, String)> {
    let (db, measurement) = id.split_once(SEPARATOR)?;
    Some((unmangle_db_name(db)?, unmangle_measurement_name(measurement)?))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            continue;
        }
        out.push(ESCAPE);
        match CODES.iter().find(|(ch, _)| *ch == c) {
            Some((_, code)) => out.push(*code),
            None => {
                out.push(HEX_CODE);
                out.push_str(&format!("{:0width$x}", c as u32, width = HEX_WIDTH));
            }
        }
    }
    out
}

fn unescape(mangled: &str) -> Option<String> {
    let mut out = String::with_capacity(mangled.len());
    let mut chars = mangled.chars();

    while let Some(c) = chars.next() {
        if c != ESCAPE {
            if !c.is_ascii_alphanumeric() {
                return None;
            }
            out.push(c);
            continue;
        }

        let code = chars.next()?;
        if code == HEX_CODE {
            let digits = chars.as_str().get(..HEX_WIDTH)?;
            let raw = u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)?;
            out.push(raw);
            chars = chars.as_str()[HEX_WIDTH..].chars();
        } else {
            let (raw, _) = CODES.iter().find(|(_, c)| *c == code)?;
            out.push(*raw);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(db: &str, m: &str) -> String {
        let id = mangle(db, m);
        assert_eq!(
            unmangle(&id),
            Some((db.to_string(), m.to_string())),
            "{} did not round-trip",
            id
        );
        id
    }

    #[test]
    fn test_plain_db_name() {
        let mangled = mangle_db_name("test");
        assert_eq!(mangled, "test");
        assert_eq!(unmangle_db_name(&mangled).as_deref(), Some("test"));
    }

    #[test]
    fn test_internal_db_alias() {
        let mangled = mangle_db_name("_internal");
        assert_eq!(mangled, "internal");
        assert_eq!(unmangle_db_name(&mangled).as_deref(), Some("_internal"));
    }

    #[test]
    fn test_leading_underscores() {
        assert_eq!(mangle_db_name("__scratch"), "U_u_uscratch");
        assert_eq!(unmangle_db_name("U_u_uscratch").as_deref(), Some("__scratch"));
    }

    #[test]
    fn test_prefix_letter_is_escaped() {
        assert_eq!(mangle_db_name("Users"), "UUsers");
        assert_eq!(unmangle_db_name("UUsers").as_deref(), Some("Users"));
        assert_ne!(mangle_db_name("_x"), mangle_db_name("U_x"));
        assert_eq!(unmangle_db_name("Users"), None);
    }

    #[test]
    fn test_collection_id_round_trip() {
        let id = round_trip("testdb", "Testing 123");
        assert!(!id.contains(' '));
        assert_eq!(id, "testdb__Testing_s123");
    }

    #[test]
    fn test_round_trip_punctuation() {
        let pairs = [
            ("_internal", "runtime"),
            ("telegraf", "cpu-load.avg"),
            ("my db", "disk/io"),
            ("_private", "snake_case_name"),
            ("db", "_leading"),
            ("Ünïcode", "temp,°C"),
        ];
        for (db, m) in pairs {
            let id = round_trip(db, m);
            assert!(!id.starts_with('_'), "{} starts with underscore", id);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }

    #[test]
    fn test_underscore_edges_round_trip() {
        assert_eq!(round_trip("metrics_", "cpu"), "metrics_u__cpu");
        round_trip("my__db", "cpu");
        round_trip("db", "a_sp_b");
        round_trip("db", "trailing_");
        round_trip("_", "__");
    }

    #[test]
    fn test_components_never_contain_separator() {
        for raw in ["a__b", "x_", "_", "a _-./b", "U_sp_"] {
            assert!(!mangle_db_name(raw).contains(SEPARATOR));
            assert!(!mangle_db_name(raw).ends_with('_'));
            assert!(!mangle_measurement_name(raw).contains(SEPARATOR));
        }
    }

    #[test]
    fn test_distinct_pairs_get_distinct_ids() {
        let pairs = [
            ("metrics", "_cpu"),
            ("metrics_", "cpu"),
            ("a b", "c"),
            ("a_sb", "c"),
            ("a", "b__c"),
            ("a__b", "c"),
        ];
        let mut ids: Vec<String> = pairs.iter().map(|(d, m)| mangle(d, m)).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), pairs.len());
    }

    #[test]
    fn test_unmangle_rejects_malformed() {
        assert_eq!(unmangle("nodelimiter"), None);
        assert_eq!(unmangle("db__bad_q"), None);
        assert_eq!(unmangle("db__short_x00"), None);
        assert_eq!(unmangle("db__trailing_"), None);
    }
}
