use serde::Serialize;

/// One row of the fixed price-tier table. Discounted amounts are pre-baked per
/// tier, not derived from a promo code's percentage; the deep-link amount
/// strings are pre-encoded the same way.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub base: i64,
    pub discounted: i64,
    pub base_encoded: &'static str,
    pub discounted_encoded: &'static str,
}

pub const PRICE_TIERS: &[PriceTier] = &[
    PriceTier { base: 199, discounted: 139, base_encoded: "199.00", discounted_encoded: "139.00" },
    PriceTier { base: 299, discounted: 209, base_encoded: "299.00", discounted_encoded: "209.00" },
    PriceTier { base: 499, discounted: 349, base_encoded: "499.00", discounted_encoded: "349.00" },
    PriceTier { base: 500, discounted: 350, base_encoded: "500.00", discounted_encoded: "350.00" },
    PriceTier { base: 999, discounted: 699, base_encoded: "999.00", discounted_encoded: "699.00" },
    PriceTier { base: 1499, discounted: 1049, base_encoded: "1499.00", discounted_encoded: "1049.00" },
];

pub const CURRENCY: &str = "INR";
pub const PAYEE_ADDRESS: &str = "syllabiq@upi";
pub const PAYEE_NAME: &str = "SyllabiQ";

/// Default platform commission on a sale, percent. Overridable via settings.
pub const DEFAULT_COMMISSION_PERCENT: f64 = 20.0;

pub fn tier_for(base: i64) -> Option<&'static PriceTier> {
    PRICE_TIERS.iter().find(|t| t.base == base)
}

pub fn is_valid_tier(base: i64) -> bool {
    tier_for(base).is_some()
}

/// Payment deep link in the external app's scheme:
/// `upi://pay?pa=<addr>&pn=<name>&am=<amount>&cu=<currency>&tn=<note>`.
pub fn payment_deep_link(amount_encoded: &str, note: &str) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu={}&tn={}",
        PAYEE_ADDRESS,
        encode_component(PAYEE_NAME),
        amount_encoded,
        CURRENCY,
        encode_component(note),
    )
}

// Minimal percent encoding for the query components we actually emit.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSplit {
    pub amount: i64,
    pub commission: f64,
    pub net: f64,
}

pub fn payment_split(amount: i64, commission_percent: f64) -> PaymentSplit {
    let commission = (amount as f64) * commission_percent / 100.0;
    PaymentSplit {
        amount,
        commission,
        net: (amount as f64) - commission,
    }
}
