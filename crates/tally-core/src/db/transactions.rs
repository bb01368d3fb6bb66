//! Ledger operations

use rusqlite::{params, OptionalExtension};

use super::{decimal_col, format_ts, parsed_col, ts_col, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionKind};
use crate::period::Period;
use crate::repository::LedgerRepository;

const TRANSACTION_COLUMNS: &str =
    "id, owner_id, kind, amount, category, occurred_at, excluded, description";

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: parsed_col(row, 2)?,
        amount: decimal_col(row, 3)?,
        category: row.get(4)?,
        occurred_at: ts_col(row, 5)?,
        excluded: row.get(6)?,
        description: row.get(7)?,
    })
}

impl Database {
    /// Insert a validated transaction and return the stored row
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        let tx = tx.clone().validated()?;
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions (owner_id, kind, amount, category, occurred_at, excluded, description)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.owner_id,
                tx.kind.as_str(),
                tx.amount.to_string(),
                tx.category,
                format_ts(tx.occurred_at),
                tx.excluded,
                tx.description,
            ],
        )?;

        Ok(Transaction {
            id: conn.last_insert_rowid(),
            owner_id: tx.owner_id,
            kind: tx.kind,
            amount: tx.amount,
            category: tx.category,
            occurred_at: tx.occurred_at,
            excluded: tx.excluded,
            description: tx.description,
        })
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
            params![id],
            row_to_transaction,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    /// Overwrite the editable fields of an existing transaction
    pub fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET kind = ?, amount = ?, category = ?, occurred_at = ?, excluded = ?, description = ?
            WHERE id = ?
            "#,
            params![
                tx.kind.as_str(),
                tx.amount.to_string(),
                tx.category,
                format_ts(tx.occurred_at),
                tx.excluded,
                tx.description,
                tx.id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("transaction {}", tx.id)));
        }
        Ok(())
    }

    /// Delete a transaction, returning the removed row
    pub fn delete_transaction(&self, id: i64) -> Result<Transaction> {
        let tx = self.get_transaction(id)?;
        let conn = self.conn()?;
        conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(tx)
    }

    /// List an owner's most recent transactions, including excluded ones
    pub fn list_transactions(&self, owner_id: i64, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE owner_id = ? ORDER BY occurred_at DESC, id DESC LIMIT ?",
            TRANSACTION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![owner_id, limit], row_to_transaction)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl LedgerRepository for Database {
    fn find_matching(
        &self,
        owner_id: i64,
        category: Option<&str>,
        kind: Option<TransactionKind>,
        range: &Period,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE owner_id = ?1
              AND excluded = 0
              AND (?2 IS NULL OR category = ?2)
              AND (?3 IS NULL OR kind = ?3)
              AND occurred_at >= ?4
              AND occurred_at < ?5
            ORDER BY occurred_at, id
            "#,
            TRANSACTION_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![
                owner_id,
                category,
                kind.map(|k| k.as_str()),
                format_ts(range.start),
                format_ts(range.end),
            ],
            row_to_transaction,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn list_owners(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT owner_id FROM transactions
            UNION
            SELECT owner_id FROM budgets
            ORDER BY owner_id
            "#,
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
