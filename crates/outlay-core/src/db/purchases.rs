//! Purchase record store operations
//!
//! Every operation is keyed by the owning user's identity. Reads return the
//! full snapshot; consumers replace their local copy wholesale rather than
//! patching it.

use chrono::{NaiveDate, Utc};
use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};
use crate::import::ParsedPurchase;
use crate::models::{category_or_default, format_display_amount, NewPurchase, PurchaseRecord};

fn row_to_purchase(row: &rusqlite::Row<'_>) -> rusqlite::Result<PurchaseRecord> {
    Ok(PurchaseRecord {
        id: row.get(0)?,
        user: row.get(1)?,
        category: row.get(2)?,
        purchase_date: row.get(3)?,
        merchant: row.get(4)?,
        location: row.get(5)?,
        notes: row.get(6)?,
        installments: row.get(7)?,
        amount: row.get(8)?,
        display_amount: row.get(9)?,
        created_at_millis: row.get(10)?,
    })
}

fn insert_row(
    conn: &rusqlite::Connection,
    user: &str,
    new: &NewPurchase,
    created_at_millis: i64,
) -> Result<PurchaseRecord> {
    let category = category_or_default(&new.category).to_string();
    let display_amount = new
        .display_amount
        .clone()
        .unwrap_or_else(|| format_display_amount(new.amount));

    conn.execute(
        r#"
        INSERT INTO purchases (user_email, category, purchase_date, merchant, location,
                               notes, installments, amount, display_amount, created_at_millis)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            user,
            category,
            new.purchase_date,
            new.merchant,
            new.location,
            new.notes,
            new.installments,
            new.amount,
            display_amount,
            created_at_millis,
        ],
    )?;

    Ok(PurchaseRecord {
        id: conn.last_insert_rowid(),
        user: user.to_string(),
        category,
        purchase_date: new.purchase_date.clone(),
        merchant: new.merchant.clone(),
        location: new.location.clone(),
        notes: new.notes.clone(),
        installments: new.installments.clone(),
        amount: new.amount,
        display_amount,
        created_at_millis,
    })
}

impl Database {
    /// Full snapshot of one user's records, in insertion order
    pub fn list_purchases(&self, user: &str) -> Result<Vec<PurchaseRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_email, category, purchase_date, merchant, location,
                   notes, installments, amount, display_amount, created_at_millis
            FROM purchases
            WHERE user_email = ?
            ORDER BY created_at_millis, id
            "#,
        )?;

        let records = stmt
            .query_map(params![user], row_to_purchase)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Append one manually entered purchase
    ///
    /// Callers validate the input first (`NewPurchase::validate`); the store
    /// itself only applies the category default and derives the display
    /// amount when none was supplied.
    pub fn insert_purchase(&self, user: &str, new: &NewPurchase) -> Result<PurchaseRecord> {
        let conn = self.conn()?;
        insert_row(&conn, user, new, Utc::now().timestamp_millis())
    }

    /// Append a batch of parser-extracted purchases, applying the snapshot
    /// defaults for whatever the parser left out
    pub fn insert_parsed(
        &self,
        user: &str,
        parsed: Vec<ParsedPurchase>,
        today: NaiveDate,
    ) -> Result<Vec<PurchaseRecord>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created_at_millis = Utc::now().timestamp_millis();

        let mut records = Vec::with_capacity(parsed.len());
        for purchase in parsed {
            let new = purchase.into_new(today);
            records.push(insert_row(&tx, user, &new, created_at_millis)?);
        }

        tx.commit()?;
        Ok(records)
    }

    /// Delete one record by id
    ///
    /// NotFound unless the record exists and belongs to `user`.
    pub fn delete_purchase(&self, user: &str, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.execute(
            "DELETE FROM purchases WHERE id = ? AND user_email = ?",
            params![id, user],
        )?;

        if deleted == 0 {
            return Err(Error::NotFound(format!("Purchase {} not found", id)));
        }
        Ok(())
    }

    /// Replace one user's entire snapshot in a single transaction
    ///
    /// Rows are re-inserted with fresh ids; callers should adopt the returned
    /// snapshot instead of reusing old ids. Supplied display strings and
    /// creation timestamps are preserved (zero timestamps become "now").
    pub fn replace_purchases(
        &self,
        user: &str,
        records: Vec<PurchaseRecord>,
    ) -> Result<Vec<PurchaseRecord>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM purchases WHERE user_email = ?",
            params![user],
        )?;

        let now = Utc::now().timestamp_millis();
        let mut snapshot = Vec::with_capacity(records.len());
        for record in records {
            let created_at_millis = if record.created_at_millis > 0 {
                record.created_at_millis
            } else {
                now
            };
            let category = category_or_default(&record.category).to_string();

            tx.execute(
                r#"
                INSERT INTO purchases (user_email, category, purchase_date, merchant, location,
                                       notes, installments, amount, display_amount, created_at_millis)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    user,
                    category,
                    record.purchase_date,
                    record.merchant,
                    record.location,
                    record.notes,
                    record.installments,
                    record.amount,
                    record.display_amount,
                    created_at_millis,
                ],
            )?;

            snapshot.push(PurchaseRecord {
                id: tx.last_insert_rowid(),
                user: user.to_string(),
                category,
                created_at_millis,
                ..record
            });
        }

        tx.commit()?;
        Ok(snapshot)
    }

    /// Number of records held for one user
    pub fn count_purchases(&self, user: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM purchases WHERE user_email = ?",
            params![user],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Distinct user identities present in the store
    pub fn list_users(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT DISTINCT user_email FROM purchases ORDER BY user_email")?;
        let users = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }
}
