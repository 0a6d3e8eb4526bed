use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::AppResult;
use crate::models::{
    Barber, Booking, BookingServiceLine, BookingStatus, Notification, Role, Service,
    ServiceCategory, User, WorkingHours,
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M";

fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn invalid_value(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value: {value}").into(),
    )
}

fn get_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn get_time(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(|e| conversion_error(idx, e))
}

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, name, surname, email, phone, role, points)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.name,
            user.surname,
            user.email,
            user.phone,
            user.role.as_str(),
            user.points,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, surname, email, phone, role, points FROM users WHERE id = ?1",
            params![id],
            |row| {
                let role: String = row.get(5)?;
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    surname: row.get(2)?,
                    email: row.get(3)?,
                    phone: row.get(4)?,
                    role: Role::parse(&role).ok_or_else(|| invalid_value(5, &role))?,
                    points: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn add_points(conn: &Connection, user_id: &str, points: i64) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE users SET points = points + ?1 WHERE id = ?2",
        params![points, user_id],
    )?;
    Ok(count > 0)
}

// ── Barbers ──

const BARBER_COLUMNS: &str =
    "b.id, b.user_id, u.name, u.surname, b.description FROM barbers b JOIN users u ON u.id = b.user_id";

fn parse_barber_row(row: &rusqlite::Row) -> rusqlite::Result<Barber> {
    Ok(Barber {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        surname: row.get(3)?,
        description: row.get(4)?,
    })
}

pub fn insert_barber(
    conn: &Connection,
    id: &str,
    user_id: &str,
    description: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO barbers (id, user_id, description) VALUES (?1, ?2, ?3)",
        params![id, user_id, description],
    )?;
    Ok(())
}

pub fn get_barber(conn: &Connection, id: &str) -> AppResult<Option<Barber>> {
    let barber = conn
        .query_row(
            &format!("SELECT {BARBER_COLUMNS} WHERE b.id = ?1"),
            params![id],
            parse_barber_row,
        )
        .optional()?;
    Ok(barber)
}

pub fn get_barber_by_user(conn: &Connection, user_id: &str) -> AppResult<Option<Barber>> {
    let barber = conn
        .query_row(
            &format!("SELECT {BARBER_COLUMNS} WHERE b.user_id = ?1"),
            params![user_id],
            parse_barber_row,
        )
        .optional()?;
    Ok(barber)
}

pub fn list_barbers(conn: &Connection) -> AppResult<Vec<Barber>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BARBER_COLUMNS} ORDER BY u.surname ASC, u.name ASC"
    ))?;
    let rows = stmt.query_map([], parse_barber_row)?;

    let mut barbers = vec![];
    for row in rows {
        barbers.push(row?);
    }
    Ok(barbers)
}

// ── Working Hours ──

fn parse_working_hours_row(row: &rusqlite::Row) -> rusqlite::Result<WorkingHours> {
    Ok(WorkingHours {
        barber_id: row.get(0)?,
        weekday: row.get(1)?,
        start: get_time(row, 2)?,
        end: get_time(row, 3)?,
    })
}

pub fn insert_working_hours(conn: &Connection, hours: &WorkingHours) -> AppResult<()> {
    conn.execute(
        "INSERT INTO working_hours (barber_id, weekday, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
        params![
            hours.barber_id,
            hours.weekday,
            hours.start.format(TIME_FORMAT).to_string(),
            hours.end.format(TIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_working_hours(
    conn: &Connection,
    barber_id: &str,
    weekday: u8,
) -> AppResult<Vec<WorkingHours>> {
    let mut stmt = conn.prepare(
        "SELECT barber_id, weekday, start_time, end_time FROM working_hours
         WHERE barber_id = ?1 AND weekday = ?2 ORDER BY start_time ASC",
    )?;
    let rows = stmt.query_map(params![barber_id, weekday], parse_working_hours_row)?;

    let mut windows = vec![];
    for row in rows {
        windows.push(row?);
    }
    Ok(windows)
}

pub fn list_working_hours(conn: &Connection, barber_id: &str) -> AppResult<Vec<WorkingHours>> {
    let mut stmt = conn.prepare(
        "SELECT barber_id, weekday, start_time, end_time FROM working_hours
         WHERE barber_id = ?1 ORDER BY weekday ASC, start_time ASC",
    )?;
    let rows = stmt.query_map(params![barber_id], parse_working_hours_row)?;

    let mut windows = vec![];
    for row in rows {
        windows.push(row?);
    }
    Ok(windows)
}

// ── Services ──

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    let category: String = row.get(5)?;
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        price_cents: row.get(4)?,
        category: ServiceCategory::parse(&category).ok_or_else(|| invalid_value(5, &category))?,
    })
}

pub fn insert_service(conn: &Connection, service: &Service) -> AppResult<()> {
    service.validate()?;
    conn.execute(
        "INSERT INTO services (id, name, description, duration_minutes, price_cents, category)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            service.id,
            service.name,
            service.description,
            service.duration_minutes,
            service.price_cents,
            service.category.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> AppResult<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, name, description, duration_minutes, price_cents, category
             FROM services WHERE id = ?1",
            params![id],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

pub fn list_services(conn: &Connection) -> AppResult<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, duration_minutes, price_cents, category
         FROM services ORDER BY category ASC, name ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str =
    "id, barber_id, customer_id, start_at, duration_minutes, status, note, created_at, updated_at";

/// Parses the booking row; line items are attached separately.
fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let status: String = row.get(5)?;
    Ok(Booking {
        id: row.get(0)?,
        barber_id: row.get(1)?,
        customer_id: row.get(2)?,
        start_at: get_datetime(row, 3)?,
        duration_minutes: row.get(4)?,
        status: BookingStatus::parse(&status).ok_or_else(|| invalid_value(5, &status))?,
        note: row.get(6)?,
        services: vec![],
        created_at: get_datetime(row, 7)?,
        updated_at: get_datetime(row, 8)?,
    })
}

fn load_lines(conn: &Connection, booking_id: &str) -> AppResult<Vec<BookingServiceLine>> {
    let mut stmt = conn.prepare(
        "SELECT service_id, price_cents, duration_minutes FROM booking_services
         WHERE booking_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        Ok(BookingServiceLine {
            service_id: row.get(0)?,
            price_cents: row.get(1)?,
            duration_minutes: row.get(2)?,
        })
    })?;

    let mut lines = vec![];
    for row in rows {
        lines.push(row?);
    }
    Ok(lines)
}

fn query_bookings(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> AppResult<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        let mut booking = row?;
        booking.services = load_lines(conn, &booking.id)?;
        bookings.push(booking);
    }
    Ok(bookings)
}

/// Writes the booking row and its line items. Callers wrap this in a transaction.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> AppResult<()> {
    conn.execute(
        "INSERT INTO bookings (id, barber_id, customer_id, start_at, duration_minutes, status, note, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            booking.id,
            booking.barber_id,
            booking.customer_id,
            format_datetime(&booking.start_at),
            booking.duration_minutes,
            booking.status.as_str(),
            booking.note,
            format_datetime(&booking.created_at),
            format_datetime(&booking.updated_at),
        ],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO booking_services (booking_id, position, service_id, price_cents, duration_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, line) in booking.services.iter().enumerate() {
        stmt.execute(params![
            booking.id,
            position as i64,
            line.service_id,
            line.price_cents,
            line.duration_minutes,
        ])?;
    }
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> AppResult<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;

    match booking {
        Some(mut booking) => {
            booking.services = load_lines(conn, &booking.id)?;
            Ok(Some(booking))
        }
        None => Ok(None),
    }
}

/// Bookings for a barber that start on `date` and still block their interval.
pub fn get_occupying_bookings(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
) -> AppResult<Vec<Booking>> {
    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);

    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE barber_id = ?1 AND start_at >= ?2 AND start_at < ?3 AND status != 'cancelled'
             ORDER BY start_at ASC"
        ),
        &[
            &barber_id,
            &format_datetime(&day_start),
            &format_datetime(&day_end),
        ],
    )
}

pub fn get_bookings_for_customer(conn: &Connection, customer_id: &str) -> AppResult<Vec<Booking>> {
    query_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1 ORDER BY start_at DESC"
        ),
        &[&customer_id],
    )
}

#[derive(Debug, Default, Clone)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub barber_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub limit: i64,
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> AppResult<Vec<Booking>> {
    let mut clauses: Vec<String> = vec![];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(barber_id) = &filter.barber_id {
        values.push(Box::new(barber_id.clone()));
        clauses.push(format!("barber_id = ?{}", values.len()));
    }
    if let Some(date) = filter.date {
        let day_start = date.and_time(NaiveTime::MIN);
        values.push(Box::new(format_datetime(&day_start)));
        clauses.push(format!("start_at >= ?{}", values.len()));
        values.push(Box::new(format_datetime(&(day_start + Duration::days(1)))));
        clauses.push(format!("start_at < ?{}", values.len()));
    }
    values.push(Box::new(filter.limit));
    let limit_idx = values.len();

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_sql} ORDER BY start_at DESC LIMIT ?{limit_idx}"
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
    query_bookings(conn, &sql, &params_refs)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: &NaiveDateTime,
) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_datetime(now), id],
    )?;
    Ok(count > 0)
}

/// Removes line items first, then the booking. Callers wrap this in a transaction.
pub fn delete_booking(conn: &Connection, id: &str) -> AppResult<bool> {
    conn.execute(
        "DELETE FROM booking_services WHERE booking_id = ?1",
        params![id],
    )?;
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Notifications ──

pub fn insert_notification(conn: &Connection, notification: &Notification) -> AppResult<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, title, message, booking_id, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            notification.id,
            notification.user_id,
            notification.kind,
            notification.title,
            notification.message,
            notification.booking_id,
            notification.read as i32,
            format_datetime(&notification.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_notifications(conn: &Connection, user_id: &str) -> AppResult<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, title, message, booking_id, is_read, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: row.get(2)?,
            title: row.get(3)?,
            message: row.get(4)?,
            booking_id: row.get(5)?,
            read: row.get::<_, i32>(6)? != 0,
            created_at: get_datetime(row, 7)?,
        })
    })?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn mark_notification_read(conn: &Connection, id: &str, user_id: &str) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

pub fn delete_read_notifications(conn: &Connection, user_id: &str) -> AppResult<usize> {
    let count = conn.execute(
        "DELETE FROM notifications WHERE user_id = ?1 AND is_read = 1",
        params![user_id],
    )?;
    Ok(count)
}

// ── Idempotency Keys ──

/// Booking previously created by `customer_id` with `key`, if recorded at or after `since`.
pub fn find_idempotent_booking(
    conn: &Connection,
    customer_id: &str,
    key: &str,
    since: &NaiveDateTime,
) -> AppResult<Option<String>> {
    let booking_id = conn
        .query_row(
            "SELECT booking_id FROM idempotency_keys
             WHERE customer_id = ?1 AND key = ?2 AND created_at >= ?3",
            params![customer_id, key, format_datetime(since)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(booking_id)
}

/// Drops keys recorded before `before`; they can no longer replay anything.
pub fn purge_idempotency_keys(conn: &Connection, before: &NaiveDateTime) -> AppResult<usize> {
    let count = conn.execute(
        "DELETE FROM idempotency_keys WHERE created_at < ?1",
        params![format_datetime(before)],
    )?;
    Ok(count)
}

pub fn record_idempotency_key(
    conn: &Connection,
    customer_id: &str,
    key: &str,
    booking_id: &str,
    now: &NaiveDateTime,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO idempotency_keys (key, customer_id, booking_id, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(customer_id, key) DO UPDATE SET
           booking_id = excluded.booking_id,
           created_at = excluded.created_at",
        params![key, customer_id, booking_id, format_datetime(now)],
    )?;
    Ok(())
}
