use statustrackr::infra::config::{redact_url, AppConfig};
use statustrackr::infra::mailer::SmtpMailer;
use statustrackr::storage::{MongoStore, MonitorStore};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-smtp]\n\
         \n\
         Reads the same environment as the service (.env is loaded when present):\n\
           MONGO_URL, DB_NAME, EMAIL_HOST, EMAIL_PORT, EMAIL_USER, EMAIL_PASSWORD\n"
    );
    std::process::exit(2);
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "<empty>".to_string()
    } else {
        "****".to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_smtp = args.iter().any(|a| a == "--skip-smtp");

    let config = AppConfig::from_env()?;

    println!("> Preflight:");
    println!("  DEPLOYMENT={}", config.deployment.as_str());
    println!("  BIND={}", config.bind_addr());
    println!(
        "  MONGO_URL={}",
        config
            .mongo_url
            .as_deref()
            .map(redact_url)
            .unwrap_or_else(|| "<unset, in-memory storage>".to_string())
    );
    println!("  DB_NAME={}", config.db_name);
    println!("  CHECK_CYCLE_SECS={}", config.check_cycle.as_secs());
    println!("  MAX_CONCURRENT_CHECKS={}", config.max_concurrent_checks);
    match &config.email {
        Some(email) => {
            println!("  EMAIL_HOST={}:{}", email.host, email.port);
            println!("  EMAIL_USER={}", email.user);
            println!("  EMAIL_PASSWORD={}", mask(&email.password));
            println!("  EMAIL_FROM={} <{}>", email.from_name, email.from);
        }
        None => println!("  EMAIL=<disabled>"),
    }

    let mut failures = Vec::new();

    match &config.mongo_url {
        Some(url) => match MongoStore::connect(url, &config.db_name).await {
            Ok(store) => match store.ping().await {
                Ok(()) => println!("  MongoDB ping ok."),
                Err(e) => failures.push(format!("MongoDB ping failed: {}", e)),
            },
            Err(e) => failures.push(format!("MONGO_URL is not usable: {}", e)),
        },
        None => println!("  MongoDB skipped (MONGO_URL unset)."),
    }

    match (&config.email, skip_smtp) {
        (_, true) => println!("  SMTP check skipped (--skip-smtp)."),
        (None, false) => println!("  SMTP check skipped (email disabled)."),
        (Some(email), false) => match SmtpMailer::new(email) {
            Ok(mailer) => match mailer.test_connection().await {
                Ok(true) => println!("  SMTP connection to {} ok.", mailer.endpoint()),
                Ok(false) => failures.push(format!("SMTP server {} refused the connection", mailer.endpoint())),
                Err(e) => failures.push(format!("SMTP connection failed: {}", e)),
            },
            Err(e) => failures.push(format!("SMTP settings are invalid: {}", e)),
        },
    }

    if !failures.is_empty() {
        for failure in &failures {
            eprintln!("  ✗ {}", failure);
        }
        return Err(anyhow::anyhow!("Preflight failed ({} problem(s))", failures.len()));
    }

    println!("> Preflight OK.");
    Ok(())
}
