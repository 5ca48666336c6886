//! Demo data loaded by `reset-db`.

use crate::db::DbPool;
use crate::models::{CreateTenant, CreateUser, UserRole};
use crate::repositories::{TenantRepository, UserRepository};

pub const DEMO_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const DEMO_PASSWORD: &str = "demo1234";

/// (email, role, first name, last name)
pub const DEMO_USERS: &[(&str, UserRole, &str, &str)] = &[
    ("superadmin@demo.local", UserRole::SuperAdmin, "Super", "Admin"),
    ("admin@demo.local", UserRole::TenantOwner, "Admin", "Demo"),
    ("staff@demo.local", UserRole::Staff, "Marco", "Staff"),
    ("client@demo.local", UserRole::Client, "Luca", "Cliente"),
];

/// (name, Italian name, category)
pub const MUSCLE_GROUPS: &[(&str, &str, &str)] = &[
    ("Chest", "Petto", "upper_body"),
    ("Back", "Schiena", "upper_body"),
    ("Shoulders", "Spalle", "upper_body"),
    ("Biceps", "Bicipiti", "upper_body"),
    ("Triceps", "Tricipiti", "upper_body"),
    ("Forearms", "Avambracci", "upper_body"),
    ("Quadriceps", "Quadricipiti", "lower_body"),
    ("Hamstrings", "Femorali", "lower_body"),
    ("Glutes", "Glutei", "lower_body"),
    ("Calves", "Polpacci", "lower_body"),
    ("Hip Flexors", "Flessori dell'anca", "lower_body"),
    ("Abdominals", "Addominali", "core"),
    ("Obliques", "Obliqui", "core"),
    ("Lower Back", "Lombare", "core"),
    ("Traps", "Trapezio", "upper_body"),
    ("Lats", "Dorsali", "upper_body"),
    ("Rotator Cuff", "Cuffia dei rotatori", "upper_body"),
    ("Adductors", "Adduttori", "lower_body"),
    ("Abductors", "Abduttori", "lower_body"),
];

/// (name, focus, periodization)
pub const MESOCYCLES: &[(&str, &str, &str)] = &[
    ("Forza Massimale", "strength", "linear"),
    ("Forza Esplosiva", "power", "undulating"),
    ("Forza Resistente", "strength_endurance", "linear"),
    ("Ipertrofia Volume", "hypertrophy", "linear"),
    ("Ipertrofia Intensiva", "hypertrophy", "undulating"),
    ("Ipertrofia Metabolica", "hypertrophy", "block"),
    ("Dimagrimento Base", "fat_loss", "linear"),
    ("Ricomposizione Corporea", "body_recomp", "undulating"),
    ("Resistenza Aerobica", "endurance", "linear"),
    ("Condizionamento Metabolico", "conditioning", "undulating"),
    ("Preparazione Generale (GPP)", "general", "linear"),
    ("Peaking / Tapering", "peaking", "block"),
    ("Deload / Scarico", "recovery", "linear"),
    ("Preparazione Atletica", "athletic", "block"),
    ("Pre-Gara", "competition", "undulating"),
];

/// (key, title, message, type, action url, priority)
pub const NOTIFICATION_TEMPLATES: &[(&str, &str, &str, &str, &str, &str)] = &[
    (
        "workout_reminder",
        "Allenamento oggi!",
        "Ciao {{clientName}}, hai un allenamento programmato per oggi.",
        "reminder",
        "/my-workout",
        "normal",
    ),
    (
        "session_completed",
        "Sessione completata!",
        "Complimenti {{clientName}}! Hai completato la sessione. +{{xp}} XP!",
        "achievement",
        "/my-workout",
        "normal",
    ),
    (
        "checkin_reminder",
        "Check-in giornaliero",
        "Buongiorno {{clientName}}! Ricorda il tuo check-in giornaliero.",
        "reminder",
        "/checkin",
        "normal",
    ),
    (
        "program_assigned",
        "Nuovo programma assegnato",
        "{{trainerName}} ti ha assegnato il programma \"{{programName}}\".",
        "info",
        "/my-workout",
        "high",
    ),
    (
        "achievement_unlocked",
        "Nuovo achievement!",
        "Hai sbloccato \"{{achievementName}}\"! +{{xp}} XP!",
        "achievement",
        "/gamification",
        "normal",
    ),
    (
        "title_unlocked",
        "Nuovo titolo sbloccato!",
        "Hai sbloccato il titolo \"{{titleName}}\"!",
        "achievement",
        "/titles",
        "high",
    ),
    (
        "level_up",
        "Level Up!",
        "Complimenti {{clientName}}! Sei salito al livello {{level}}!",
        "achievement",
        "/gamification",
        "high",
    ),
    (
        "appointment_created",
        "Appuntamento confermato",
        "Appuntamento con {{trainerName}} confermato per {{date}} alle {{time}}.",
        "info",
        "/calendar",
        "normal",
    ),
    (
        "appointment_reminder",
        "Appuntamento tra poco",
        "Hai un appuntamento con {{trainerName}} tra 1 ora.",
        "reminder",
        "/calendar",
        "high",
    ),
    (
        "subscription_expiring",
        "Abbonamento in scadenza",
        "Il tuo abbonamento scade tra {{days}} giorni.",
        "warning",
        "/settings",
        "high",
    ),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub muscle_groups: usize,
    pub mesocycles: usize,
    pub notification_templates: usize,
}

/// Insert the demo tenant, its users and the shared catalogs into a freshly
/// migrated database.
pub async fn seed_demo(pool: &DbPool) -> anyhow::Result<SeedSummary> {
    let tenant_repo = TenantRepository::new(pool.clone());
    let user_repo = UserRepository::new(pool.clone());

    tenant_repo
        .create(CreateTenant {
            id: Some(DEMO_TENANT_ID.to_string()),
            business_name: "Demo PT Studio".to_string(),
            owner_email: "admin@demo.local".to_string(),
            subscription_plan: "professional".to_string(),
            max_clients: 9999,
        })
        .await?;
    tracing::debug!("Demo tenant created");

    for (email, role, first_name, last_name) in DEMO_USERS {
        user_repo
            .create(
                DEMO_TENANT_ID,
                &CreateUser {
                    email: email.to_string(),
                    password: DEMO_PASSWORD.to_string(),
                    role: *role,
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                },
            )
            .await?;
    }

    let pool = pool.clone();
    let summary = tokio::task::spawn_blocking(move || seed_catalogs(&pool)).await??;

    Ok(SeedSummary {
        users: DEMO_USERS.len(),
        ..summary
    })
}

fn seed_catalogs(pool: &DbPool) -> anyhow::Result<SeedSummary> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    {
        let mut stmt =
            tx.prepare("INSERT INTO muscle_groups (name, name_it, category) VALUES (?, ?, ?)")?;
        for (name, name_it, category) in MUSCLE_GROUPS {
            stmt.execute([name, name_it, category])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO mesocycles (name, focus, periodization_type) VALUES (?, ?, ?)",
        )?;
        for (name, focus, periodization) in MESOCYCLES {
            stmt.execute([name, focus, periodization])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO notification_templates (template_key, title, message, type, action_url, priority)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for (key, title, message, kind, action_url, priority) in NOTIFICATION_TEMPLATES {
            stmt.execute([key, title, message, kind, action_url, priority])?;
        }
    }

    tx.commit()?;

    Ok(SeedSummary {
        users: 0,
        muscle_groups: MUSCLE_GROUPS.len(),
        mesocycles: MESOCYCLES.len(),
        notification_templates: NOTIFICATION_TEMPLATES.len(),
    })
}
