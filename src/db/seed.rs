use anyhow::Context;
use rusqlite::Connection;
use uuid::Uuid;

use super::queries;
use crate::models::{Role, Service, ServiceCategory, User, WorkingHours};

/// Ids of the rows created by [`seed_demo_data`].
#[derive(Debug, Clone)]
pub struct DemoIds {
    pub admin: String,
    pub barber_mario: String,
    pub barber_mario_user: String,
    pub barber_luca: String,
    pub barber_luca_user: String,
    pub client_paolo: String,
    pub client_giulia: String,
    pub service_cut: String,
    pub service_beard: String,
    pub service_combo: String,
    pub service_color: String,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn user(name: &str, surname: &str, email: &str, role: Role) -> User {
    User {
        id: new_id(),
        name: name.to_string(),
        surname: surname.to_string(),
        email: email.to_string(),
        phone: None,
        role,
        points: 0,
    }
}

fn service(name: &str, description: &str, duration_minutes: i64, price_cents: i64, category: ServiceCategory) -> Service {
    Service {
        id: new_id(),
        name: name.to_string(),
        description: Some(description.to_string()),
        duration_minutes,
        price_cents,
        category,
    }
}

/// Admin, two barbers working Monday to Saturday 09:00-18:00, two clients and the classic services.
pub fn seed_demo_data(conn: &Connection) -> anyhow::Result<DemoIds> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start seed transaction")?;

    let admin = user("Admin", "Sistema", "admin@barbershop.it", Role::Admin);
    let mario = user("Mario", "Rossi", "mario.rossi@barbershop.it", Role::Barber);
    let luca = user("Luca", "Bianchi", "luca.bianchi@barbershop.it", Role::Barber);
    let paolo = user("Paolo", "Verdi", "cliente1@example.com", Role::Client);
    let giulia = user("Giulia", "Neri", "cliente2@example.com", Role::Client);
    for u in [&admin, &mario, &luca, &paolo, &giulia] {
        queries::insert_user(&tx, u).with_context(|| format!("failed to seed user {}", u.email))?;
    }

    let barber_mario = new_id();
    let barber_luca = new_id();
    queries::insert_barber(
        &tx,
        &barber_mario,
        &mario.id,
        Some("Specializzato in tagli classici e cura della barba"),
    )?;
    queries::insert_barber(
        &tx,
        &barber_luca,
        &luca.id,
        Some("Esperto in tagli moderni e colorazioni"),
    )?;

    for barber_id in [&barber_mario, &barber_luca] {
        for weekday in 1..=6 {
            let hours = WorkingHours::new(barber_id, weekday, "09:00", "18:00")?;
            queries::insert_working_hours(&tx, &hours)?;
        }
    }

    let cut = service("Taglio Classico", "Taglio classico con forbici e sfumatura", 30, 2500, ServiceCategory::Taglio);
    let beard = service("Barba Completa", "Sistemazione barba con rasoio e finiture", 30, 2000, ServiceCategory::Barba);
    let combo = service("Taglio + Barba", "Taglio classico e sistemazione barba", 60, 4000, ServiceCategory::Combo);
    let color = service("Colorazione", "Colorazione professionale", 90, 5000, ServiceCategory::Colorazione);
    for s in [&cut, &beard, &combo, &color] {
        queries::insert_service(&tx, s).with_context(|| format!("failed to seed service {}", s.name))?;
    }

    tx.commit().context("failed to commit seed data")?;
    tracing::info!("seeded demo data");

    Ok(DemoIds {
        admin: admin.id,
        barber_mario,
        barber_mario_user: mario.id,
        barber_luca,
        barber_luca_user: luca.id,
        client_paolo: paolo.id,
        client_giulia: giulia.id,
        service_cut: cut.id,
        service_beard: beard.id,
        service_combo: combo.id,
        service_color: color.id,
    })
}
