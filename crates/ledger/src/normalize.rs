//! Transaction name normalization.

/// Tokens the bank feeds prepend or append to descriptions.
const NOISE_TOKENS: [&str; 4] = ["debit", "credit", "payment", "transfer"];

fn is_noise(token: &str) -> bool {
    NOISE_TOKENS.contains(&token)
}

/// Normalize a raw transaction description.
///
/// Lowercases, collapses whitespace and strips leading/trailing
/// `debit|credit|payment|transfer` tokens. A lone noise token is kept so the
/// result is never emptied by stripping. Idempotent.
pub fn normalize_transaction_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

    while tokens.len() > 1 && is_noise(tokens[0]) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && tokens.last().is_some_and(|t| is_noise(t)) {
        tokens.pop();
    }

    tokens.join(" ")
}
