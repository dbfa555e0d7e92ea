use chrono::NaiveDate;
use rusqlite::{params, Connection, Result};

/// Seed development reference data: machines, topology, speeds, and shifts
/// (§4.10). Adapted from the teacher's `seed_machines`/`seed_*` pattern — one
/// function per table, plain `INSERT` statements, no transaction wrapping since
/// this only runs once against a freshly created empty database.
pub fn seed_reference_data(conn: &Connection) -> Result<()> {
    seed_machines(conn)?;
    seed_relations(conn)?;
    seed_speeds(conn)?;
    seed_shift_windows(conn)?;
    Ok(())
}

fn seed_machines(conn: &Connection) -> Result<()> {
    let machines = vec![
        ("HJB-01", "PACKER", "active"),
        ("HJB-02", "PACKER", "active"),
        ("HJB-03", "PACKER", "idle"),
        ("HWS-01", "FEEDER", "active"),
        ("HWS-02", "FEEDER", "active"),
    ];

    for (code, kind, status) in machines {
        conn.execute(
            "INSERT INTO machines (code, kind, status) VALUES (?1, ?2, ?3)",
            params![code, kind, status],
        )?;
    }
    Ok(())
}

fn seed_relations(conn: &Connection) -> Result<()> {
    let far_future: Option<NaiveDate> = None;
    let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

    let relations = vec![
        ("HWS-01", "HJB-01", 0),
        ("HWS-01", "HJB-02", 1),
        ("HWS-02", "HJB-03", 0),
    ];

    for (feeder, maker, priority) in relations {
        conn.execute(
            "INSERT INTO relations (feeder_code, maker_code, priority, effective_from, effective_to)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![feeder, maker, priority, epoch, far_future],
        )?;
    }
    Ok(())
}

fn seed_speeds(conn: &Connection) -> Result<()> {
    let speeds = vec![
        ("HJB-01", "ART-SOFT-20", 600.0, 0.95),
        ("HJB-02", "ART-SOFT-20", 580.0, 0.95),
        ("HJB-03", "*", 500.0, 0.90),
        ("*", "ART-HARD-10", 450.0, 0.92),
    ];

    for (machine_code, article_nr, boxes_per_hour, efficiency) in speeds {
        conn.execute(
            "INSERT INTO speeds (machine_code, article_nr, boxes_per_hour, efficiency)
             VALUES (?1, ?2, ?3, ?4)",
            params![machine_code, article_nr, boxes_per_hour, efficiency],
        )?;
    }
    Ok(())
}

fn seed_shift_windows(conn: &Connection) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let far_future: Option<NaiveDate> = None;

    let shifts = vec![
        ("Day", "*", "08:00:00", "20:00:00", 0, 0),
        ("Night", "*", "20:00:00", "08:00:00", 1, 120),
    ];

    for (name, scope, start, end, may_ot, max_ot) in shifts {
        conn.execute(
            "INSERT INTO shift_windows
                (shift_name, machine_scope, start_of_day, end_of_day, may_overtime, max_overtime_minutes, effective_from, effective_to)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![name, scope, start, end, may_ot, max_ot, epoch, far_future],
        )?;
    }
    Ok(())
}
