// Country catalog - the codes the settings surface offers for selection.

use super::policy_models::CountryCode;

/// Every code the operator can toggle, in display order.
pub const SELECTABLE_COUNTRIES: &[&str] = &[
    "AF", "AL", "DZ", "AD", "AO", "AG", "AR", "AM", "AU", "AT", //
    "AZ", "BS", "BH", "BD", "BB", "BY", "BE", "BZ", "BJ", "BT", //
    "BO", "BA", "BW", "BR", "BN", "BG", "BF", "BI", "CV", "KH", //
    "CM", "CA", "CF", "TD", "CL", "CN", "CO", "KM", "CD", "CG", //
    "CR", "CI", "HR", "CU", "CY", "CZ", "DK", "DJ", "DM", "DO", //
    "EC", "EG", "SV", "GQ", "ER", "EE", "SZ", "ET", "FJ", "FI", //
    "FR", "GA", "GM", "GE", "DE", "GH", "GR", "GD", "GT", "GN", //
    "GW", "GY", "HT", "HN", "HU", "IS", "IN", "ID", "IR", "IQ", //
    "IE", "IL", "IT", "JM", "JP", "JO", "KZ", "KE", "KI", "KP", //
    "KR", "KW", "KG", "LA", "LV", "LB", "LS", "LR", "LY", "LI", //
    "LT", "LU", "MG", "MW", "MY", "MV", "ML", "MT", "MH", "MR", //
    "MU", "MX", "FM", "MD", "MC", "MN", "ME", "MA", "MZ", "MM", //
    "NA", "NR", "NP", "NL", "NZ", "NI", "NE", "NG", "MK", "NO", //
    "OM", "PK", "PW", "PA", "PG", "PY", "PE", "PH", "PL", "PT", //
    "QA", "RO", "RU", "RW", "KN", "LC", "VC", "WS", "SM", "ST", //
    "SA", "SN", "RS", "SC", "SL", "SG", "SK", "SI", "SB", "SO", //
    "ZA", "SS", "ES", "LK", "SD", "SR", "SE", "CH", "SY", "TW", //
    "TJ", "TZ", "TH", "TL", "TG", "TO", "TT", "TN", "TR", "TM", //
    "TV", "UG", "UA", "AE", "GB", "US", "UY", "UZ", "VU", "VA", //
    "VE", "VN", "YE", "ZM", "ZW", "PS", "PR", "RE", "YT", "SH", //
    "EH",
];

/// Default exempt code for "block everything except my own country".
pub const DEFAULT_HOME_COUNTRY: &str = "US";

/// Selectable codes plus the operator's own (exempt) country.
#[derive(Debug, Clone)]
pub struct CountryCatalog {
    codes: Vec<CountryCode>,
    home: CountryCode,
}

impl CountryCatalog {
    pub fn new(home: CountryCode) -> Self {
        let codes = SELECTABLE_COUNTRIES
            .iter()
            .filter_map(|raw| CountryCode::parse(raw).ok())
            .collect();
        Self { codes, home }
    }

    pub fn codes(&self) -> &[CountryCode] {
        &self.codes
    }

    pub fn contains(&self, code: &CountryCode) -> bool {
        self.codes.contains(code)
    }

    pub fn home(&self) -> &CountryCode {
        &self.home
    }

    /// Everything selectable except the home country.
    pub fn foreign_codes(&self) -> Vec<CountryCode> {
        self.codes
            .iter()
            .filter(|c| **c != self.home)
            .cloned()
            .collect()
    }
}
