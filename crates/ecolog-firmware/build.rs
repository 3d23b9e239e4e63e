use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    // Secrets live in a git-ignored `.env` next to the workspace root.
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=ECOLOG_RADIO_KEY");
    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=No .env loaded ({e}), using environment only");
    }

    let key = match std::env::var("ECOLOG_RADIO_KEY") {
        Ok(key) => key,
        Err(_) => {
            println!("cargo:warning=ECOLOG_RADIO_KEY not set, the modem gets a zero key");
            "0".repeat(32)
        }
    };
    println!("cargo:rustc-env=ECOLOG_RADIO_KEY={key}");

    // Seeds the RTC when its backup battery has run out.
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    println!("cargo:rustc-env=ECOLOG_BUILD_EPOCH={epoch}");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
