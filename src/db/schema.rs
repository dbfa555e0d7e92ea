use rusqlite::{Connection, Result};

/// Create all database tables (§3 persistence mapping, §4.10). Grounded in the
/// teacher's `db/schema.rs`: one `execute_batch` of `CREATE TABLE IF NOT EXISTS`
/// statements, `CHECK` constraints standing in for the domain's enums.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Machines: packers and feeders (§3 Machine)
        CREATE TABLE IF NOT EXISTS machines (
            code TEXT PRIMARY KEY,
            kind TEXT NOT NULL CHECK (kind IN ('PACKER', 'FEEDER')),
            status TEXT NOT NULL CHECK (status IN ('active', 'idle', 'maintenance', 'error'))
        );

        -- Feeder <-> packer topology (§3 Relation)
        CREATE TABLE IF NOT EXISTS relations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            feeder_code TEXT NOT NULL REFERENCES machines(code) ON DELETE CASCADE,
            maker_code TEXT NOT NULL REFERENCES machines(code) ON DELETE CASCADE,
            priority INTEGER NOT NULL DEFAULT 0,
            effective_from TEXT NOT NULL,
            effective_to TEXT
        );

        -- Machine/article speed table (§3 Speed)
        CREATE TABLE IF NOT EXISTS speeds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            machine_code TEXT NOT NULL,
            article_nr TEXT NOT NULL,
            boxes_per_hour REAL NOT NULL,
            efficiency REAL NOT NULL DEFAULT 1.0,
            UNIQUE(machine_code, article_nr)
        );

        -- Shift calendar (§3 ShiftWindow)
        CREATE TABLE IF NOT EXISTS shift_windows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shift_name TEXT NOT NULL,
            machine_scope TEXT NOT NULL DEFAULT '*',
            start_of_day TEXT NOT NULL,
            end_of_day TEXT NOT NULL,
            may_overtime INTEGER NOT NULL DEFAULT 0,
            max_overtime_minutes INTEGER NOT NULL DEFAULT 0,
            effective_from TEXT NOT NULL,
            effective_to TEXT
        );

        -- Maintenance windows (§3 MaintenanceWindow)
        CREATE TABLE IF NOT EXISTS maintenance_windows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            machine_code TEXT NOT NULL REFERENCES machines(code) ON DELETE CASCADE,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            status TEXT NOT NULL CHECK (
                status IN ('PLANNED', 'CONFIRMED', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED')
            )
        );

        -- Decade-plan rows, grouped by import batch (§3 DecadeRow, §4.3)
        CREATE TABLE IF NOT EXISTS decade_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            work_order_nr TEXT NOT NULL,
            article_nr TEXT NOT NULL,
            package_type TEXT NOT NULL,
            spec TEXT NOT NULL DEFAULT '',
            qty_total REAL NOT NULL,
            qty_final REAL NOT NULL,
            feeder_codes TEXT NOT NULL,
            maker_codes TEXT NOT NULL,
            planned_start TEXT NOT NULL,
            planned_end TEXT NOT NULL,
            row_number INTEGER NOT NULL,
            validation_status TEXT NOT NULL CHECK (
                validation_status IN ('VALID', 'WARNING', 'ERROR')
            )
        );

        -- Scheduling tasks (§3 SchedulingTask, §4.9)
        CREATE TABLE IF NOT EXISTS scheduling_tasks (
            task_id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL,
            status TEXT NOT NULL CHECK (
                status IN ('PENDING', 'RUNNING', 'COMPLETED', 'FAILED', 'CANCELLED')
            ),
            current_stage TEXT NOT NULL,
            progress INTEGER NOT NULL DEFAULT 0,
            start_time TEXT,
            end_time TEXT,
            flags TEXT NOT NULL,
            error_message TEXT,
            result_summary TEXT
        );

        -- Daily sequence allocator, unique per (kind, date) (§3 DailySequence, §4.8)
        CREATE TABLE IF NOT EXISTS daily_sequence (
            order_kind TEXT NOT NULL CHECK (order_kind IN ('HJB', 'HWS')),
            plan_date TEXT NOT NULL,
            next_value INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (order_kind, plan_date)
        );

        -- Packer orders / HJB (§3 PackerOrder)
        CREATE TABLE IF NOT EXISTS packer_orders (
            plan_id TEXT PRIMARY KEY,
            production_line TEXT NOT NULL,
            material_code TEXT NOT NULL,
            quantity REAL NOT NULL,
            plan_start TEXT NOT NULL,
            plan_end TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            plan_date TEXT NOT NULL,
            shift TEXT NOT NULL,
            input_plan_id TEXT NOT NULL,
            input_batch_code TEXT NOT NULL,
            task_id TEXT NOT NULL REFERENCES scheduling_tasks(task_id) ON DELETE CASCADE,
            status TEXT NOT NULL CHECK (
                status IN ('PLANNED', 'DISPATCHED', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED')
            )
        );

        -- Feeder orders / HWS (§3 FeederOrder)
        CREATE TABLE IF NOT EXISTS feeder_orders (
            plan_id TEXT PRIMARY KEY,
            production_line TEXT NOT NULL,
            material_code TEXT NOT NULL,
            plan_start TEXT NOT NULL,
            plan_end TEXT NOT NULL,
            sequence INTEGER NOT NULL,
            plan_date TEXT NOT NULL,
            shift TEXT NOT NULL,
            task_id TEXT NOT NULL REFERENCES scheduling_tasks(task_id) ON DELETE CASCADE,
            safety_stock REAL,
            is_last_one INTEGER
        );

        -- Structured stage log stream (§3 StageLogEntry, §4.11)
        CREATE TABLE IF NOT EXISTS stage_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id TEXT NOT NULL REFERENCES scheduling_tasks(task_id) ON DELETE CASCADE,
            stage TEXT NOT NULL,
            step TEXT NOT NULL,
            level TEXT NOT NULL,
            message TEXT NOT NULL,
            data TEXT,
            duration_ms INTEGER,
            logged_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_decade_rows_batch ON decade_rows(batch_id);
        CREATE INDEX IF NOT EXISTS idx_decade_rows_planned_start ON decade_rows(planned_start);
        CREATE INDEX IF NOT EXISTS idx_relations_feeder ON relations(feeder_code);
        CREATE INDEX IF NOT EXISTS idx_relations_maker ON relations(maker_code);
        CREATE INDEX IF NOT EXISTS idx_maintenance_machine ON maintenance_windows(machine_code);
        CREATE INDEX IF NOT EXISTS idx_packer_orders_line ON packer_orders(production_line);
        CREATE INDEX IF NOT EXISTS idx_packer_orders_task ON packer_orders(task_id);
        CREATE INDEX IF NOT EXISTS idx_feeder_orders_task ON feeder_orders(task_id);
        CREATE INDEX IF NOT EXISTS idx_stage_log_task ON stage_log(task_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_batch ON scheduling_tasks(batch_id);
        "#,
    )?;

    Ok(())
}
