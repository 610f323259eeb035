use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "OE_HOST",
        "OE_PORT",
        "OE_DATABASE_URL",
        "OE_MAX_DB_CONNECTIONS",
        "OE_SHIPPING_FEE",
        "OE_TAX_RATE",
        "OE_CURRENCY",
        "OE_UNPAID_ORDER_TIMEOUT",
        "OE_GATEWAY_TIMEOUT",
        "OE_ALLOW_PLACEHOLDER_BILLING",
        "OE_USE_X_FORWARDED_FOR",
        "OE_USE_FORWARDED",
        "OE_PAYMOB_BASE_URL",
        "OE_PAYMOB_INTEGRATION_ID",
        "OE_PAYMOB_IFRAME_ID",
        "OE_PAYMOB_PAYMENT_KEY_EXPIRY",
        "OE_PAYMOB_REQUEST_TIMEOUT",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
