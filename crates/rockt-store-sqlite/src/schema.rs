//! SQL schema for the rockt SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT    NOT NULL UNIQUE,
    balance     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL,
    riding_car  INTEGER,            -- check-in: car number, NULL when not riding
    riding_stop TEXT                -- check-in: boarding stop number
);

CREATE TABLE IF NOT EXISTS stops (
    number      TEXT PRIMARY KEY,
    route       INTEGER,
    longitude   REAL NOT NULL,
    latitude    REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS cars (
    number        INTEGER PRIMARY KEY,
    route         INTEGER,
    active        INTEGER NOT NULL DEFAULT 0,
    longitude     REAL    NOT NULL,
    latitude      REAL    NOT NULL,
    owner_id      INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
    owner_riders  INTEGER NOT NULL DEFAULT 0,
    owner_revenue INTEGER NOT NULL DEFAULT 0,
    total_riders  INTEGER NOT NULL DEFAULT 0,
    total_revenue INTEGER NOT NULL DEFAULT 0
);

-- Events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table. User ids inside
-- data_json are deliberately not foreign keys.
CREATE TABLE IF NOT EXISTS events (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id    TEXT    NOT NULL UNIQUE,
    event       TEXT    NOT NULL,   -- 'car_bought' | 'car_sold' | 'car_ride'
    car         INTEGER NOT NULL,   -- copy of data_json.car, for indexing
    data_json   TEXT    NOT NULL,
    recorded_at TEXT    NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE INDEX IF NOT EXISTS cars_route_idx  ON cars(route, active, latitude, longitude);
CREATE INDEX IF NOT EXISTS cars_owner_idx  ON cars(owner_id);
CREATE INDEX IF NOT EXISTS stops_loc_idx   ON stops(latitude, longitude);
CREATE INDEX IF NOT EXISTS events_car_idx  ON events(car, seq);

PRAGMA user_version = 1;
";
