//! Common regex patterns for F29 extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Numeric tokens: dot-grouped thousands (3.410.651) or a bare digit run
    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"\d{1,3}(?:\.\d{3})+|\d+"
    ).unwrap();

    // RUT (Chilean tax ID)
    pub static ref RUT_LABELED: Regex = Regex::new(
        r"(?i)R\.?\s?U\.?\s?T\.?(?:\s*N[°ºo]\.?)?[\s:]*(\d{1,2}(?:\.?\d{3}){2})\s*-\s*([\dk])"
    ).unwrap();

    pub static ref RUT_STANDALONE: Regex = Regex::new(
        r"(?i)(?:^|[^\d.])(\d{1,2}\.\d{3}\.\d{3}|\d{7,8})-([\dk])(?:[^\w]|$)"
    ).unwrap();

    // Tax period
    pub static ref PERIOD_LABELED: Regex = Regex::new(
        r"(?i)PER[IÍ]ODO(?:\s+TRIBUTARIO)?[\s:.\-]*(\d{6}|\d{1,2}\s*[/\-]\s*\d{4}|\d{4}\s*[/\-]\s*\d{1,2})"
    ).unwrap();

    pub static ref PERIOD_STANDALONE: Regex = Regex::new(
        r"(?:^|\D)(20\d{2}(?:0[1-9]|1[0-2]))(?:\D|$)"
    ).unwrap();

    pub static ref PERIOD_SPLIT: Regex = Regex::new(
        r"^(\d{1,4})\s*[/\-]\s*(\d{1,4})$"
    ).unwrap();

    // Form serial number
    pub static ref FOLIO: Regex = Regex::new(
        r"(?i)FOLIO[\s:.N°º]*(\d{3,})"
    ).unwrap();

    // Company name, up to the end of the line
    pub static ref RAZON_SOCIAL: Regex = Regex::new(
        r"(?i)(?:RAZ[ÓO]N\s+SOCIAL|NOMBRE(?:\s+O\s+RAZ[ÓO]N\s+SOCIAL)?)\s*[:\-]?\s*([^\r\n]{3,120})"
    ).unwrap();

    // Canonical F29 period, as checked by the validator
    pub static ref PERIOD_CANONICAL: Regex = Regex::new(
        r"^20\d{4}$"
    ).unwrap();
}
