//! Bill number allocation.
//!
//! Numbers read `YYYY-NNNN`: the UTC year of creation and a per
//! (organisation, year) sequence starting at 1, zero-padded to four digits
//! and widening past 9999.
//!
//! In Postgres the sequence lives in `bill_sequences`. Incrementing the row
//! with `INSERT .. ON CONFLICT DO UPDATE .. RETURNING` inside the bill's
//! transaction takes a row lock, so concurrent allocations for the same
//! organisation and year serialize and never observe the same value.

use sqlx::PgConnection;
use uuid::Uuid;

/// Longest sequence part accepted from stored numbers.
const MAX_SEQUENCE_DIGITS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BillNumber {
    pub year: i32,
    pub sequence: i64,
}

impl BillNumber {
    pub fn new(year: i32, sequence: i64) -> Self {
        Self { year, sequence }
    }

    /// Parses `YYYY-N..`; anything else (including legacy or hand-edited
    /// numbers) yields `None` and is ignored by allocation.
    pub fn parse(s: &str) -> Option<Self> {
        let (year, sequence) = s.split_once('-')?;

        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if sequence.is_empty()
            || sequence.len() > MAX_SEQUENCE_DIGITS
            || !sequence.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        Some(Self::new(year.parse().ok()?, sequence.parse().ok()?))
    }

    /// Postgres regular expression matching well-formed numbers of `year`.
    pub fn sql_pattern(year: i32) -> String {
        format!("^{:04}-[0-9]{{1,{}}}$", year, MAX_SEQUENCE_DIGITS)
    }
}

impl std::fmt::Display for BillNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:04}", self.year, self.sequence)
    }
}

/// Greatest well-formed number of `year` among `existing`, if any.
pub fn latest_for_year<'a, I>(existing: I, year: i32) -> Option<BillNumber>
where
    I: IntoIterator<Item = &'a str>,
{
    existing
        .into_iter()
        .filter_map(BillNumber::parse)
        .filter(|n| n.year == year)
        .max()
}

/// Takes the next number for `(organisation, year)` on `conn`, which must be
/// inside the transaction that inserts the bill.
///
/// The first allocation of a year seeds the counter from bills already
/// stored, so numbers written before the counter existed are never reissued.
pub async fn allocate(
    conn: &mut PgConnection,
    organisation_id: Uuid,
    year: i32,
) -> Result<BillNumber, sqlx::Error> {
    let sequence: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO bill_sequences (organisation_id, year, last_value)
        VALUES (
            $1,
            $2,
            (
                SELECT COALESCE(MAX(split_part(bill_number, '-', 2)::BIGINT), 0)
                FROM bills
                WHERE organisation_id = $1 AND bill_number ~ $3
            ) + 1
        )
        ON CONFLICT (organisation_id, year)
        DO UPDATE SET last_value = bill_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(organisation_id)
    .bind(year)
    .bind(BillNumber::sql_pattern(year))
    .fetch_one(&mut *conn)
    .await?;

    Ok(BillNumber::new(year, sequence))
}

/// Raises the counter to the greatest stored number of the year.
pub async fn resync(
    conn: &mut PgConnection,
    organisation_id: Uuid,
    year: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO bill_sequences (organisation_id, year, last_value)
        SELECT $1, $2, COALESCE(MAX(split_part(bill_number, '-', 2)::BIGINT), 0)
        FROM bills
        WHERE organisation_id = $1 AND bill_number ~ $3
        ON CONFLICT (organisation_id, year)
        DO UPDATE SET last_value = GREATEST(bill_sequences.last_value, EXCLUDED.last_value)
        "#,
    )
    .bind(organisation_id)
    .bind(year)
    .bind(BillNumber::sql_pattern(year))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_four_digits() {
        assert_eq!(BillNumber::new(2025, 1).to_string(), "2025-0001");
        assert_eq!(BillNumber::new(2025, 42).to_string(), "2025-0042");
        assert_eq!(BillNumber::new(2025, 10000).to_string(), "2025-10000");
    }

    #[test]
    fn test_parse_round_trips_formatted_numbers() {
        let n = BillNumber::new(2024, 17);
        assert_eq!(BillNumber::parse(&n.to_string()), Some(n));
        assert_eq!(
            BillNumber::parse("2025-10000"),
            Some(BillNumber::new(2025, 10000))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "", "2025", "2025-", "25-0001", "2025-00a1", "abcd-0001", "2025-0001-1",
            "2025-1234567890",
        ] {
            assert_eq!(BillNumber::parse(bad), None, "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_latest_for_year_ignores_other_years_and_garbage() {
        let existing = ["2024-0009", "2025-0002", "2025-0010", "2025-XYZ", "legacy"];
        assert_eq!(
            latest_for_year(existing, 2025),
            Some(BillNumber::new(2025, 10))
        );
        assert_eq!(latest_for_year(existing, 2023), None);
    }

    #[test]
    fn test_sql_pattern() {
        assert_eq!(BillNumber::sql_pattern(2025), "^2025-[0-9]{1,9}$");
    }
}
