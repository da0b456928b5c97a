use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

pub fn open_db(db_path: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    configure_connection(&conn, busy_timeout)?;
    Ok(conn)
}

pub fn configure_connection(conn: &Connection, busy_timeout: Duration) -> anyhow::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    // journal_mode returns a row, so it can't go through execute().
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
    Ok(())
}

pub fn apply_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            total_fees INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            class_id INTEGER NOT NULL,
            amount_paid REAL NOT NULL DEFAULT 0,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS payments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            amount_paid REAL NOT NULL,
            payment_date TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            term TEXT NOT NULL,
            session TEXT NOT NULL,
            note TEXT,
            reference_code TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payments_student ON payments(student_id)",
        [],
    )?;

    // Databases created before fees were tracked per class lack the column.
    ensure_classes_total_fees(conn)?;
    ensure_students_amount_paid(conn)?;

    Ok(())
}

/// Inserts `(name, fee)` pairs when the classes table is still empty.
pub fn seed_classes(conn: &Connection, classes: &[(String, i64)]) -> anyhow::Result<usize> {
    if classes.is_empty() {
        return Ok(0);
    }
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM classes", [], |r| r.get(0))?;
    if existing > 0 {
        return Ok(0);
    }
    let tx = conn.unchecked_transaction()?;
    for (name, fee) in classes {
        tx.execute(
            "INSERT INTO classes(name, total_fees) VALUES(?, ?)",
            (name, fee),
        )?;
    }
    tx.commit()?;
    Ok(classes.len())
}

fn ensure_classes_total_fees(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "classes", "total_fees")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE classes ADD COLUMN total_fees INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn ensure_students_amount_paid(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "amount_paid")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE students ADD COLUMN amount_paid REAL NOT NULL DEFAULT 0",
        [],
    )?;
    // Backfill the running total from whatever payments already exist.
    conn.execute(
        "UPDATE students SET amount_paid = COALESCE(
           (SELECT SUM(p.amount_paid) FROM payments p WHERE p.student_id = students.id), 0)",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent_and_seed_only_fills_empty_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = open_db(&dir.path().join("fees.sqlite3"), Duration::from_millis(500))
            .expect("open db");
        apply_schema(&conn).expect("schema");
        apply_schema(&conn).expect("schema again");

        let seeded = seed_classes(
            &conn,
            &[("JSS1".to_string(), 50_000), ("JSS2".to_string(), 60_000)],
        )
        .expect("seed");
        assert_eq!(seeded, 2);
        let again = seed_classes(&conn, &[("JSS3".to_string(), 1)]).expect("seed again");
        assert_eq!(again, 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM classes", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 2);
    }

    #[test]
    fn legacy_students_table_gets_amount_paid_backfilled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = open_db(&dir.path().join("old.sqlite3"), Duration::from_millis(500))
            .expect("open db");
        conn.execute_batch(
            "CREATE TABLE classes(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, total_fees INTEGER NOT NULL DEFAULT 0);
             CREATE TABLE students(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, class_id INTEGER NOT NULL);
             INSERT INTO classes(name, total_fees) VALUES('SS1', 1000);
             INSERT INTO students(name, class_id) VALUES('Ada', 1);",
        )
        .expect("legacy tables");
        conn.execute(
            "CREATE TABLE payments(id INTEGER PRIMARY KEY AUTOINCREMENT, student_id INTEGER NOT NULL, amount_paid REAL NOT NULL, payment_date TEXT NOT NULL, payment_method TEXT NOT NULL, term TEXT NOT NULL, session TEXT NOT NULL, note TEXT, reference_code TEXT NOT NULL)",
            [],
        )
        .expect("payments");
        conn.execute(
            "INSERT INTO payments(student_id, amount_paid, payment_date, payment_method, term, session, reference_code)
             VALUES(1, 250, '2024-01-01T00:00:00Z', 'cash', 'First', '2023/2024', 'R1')",
            [],
        )
        .expect("payment");

        apply_schema(&conn).expect("migrate");
        let paid: f64 = conn
            .query_row("SELECT amount_paid FROM students WHERE id = 1", [], |r| {
                r.get(0)
            })
            .expect("paid");
        assert_eq!(paid, 250.0);
    }
}
