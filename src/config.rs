use chrono::{Local, NaiveDate};

use crate::{Error, Result};

/// User-facing texts attached to fields as custom validity messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub phone: String,
    pub email: String,
    pub past_date: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            phone: "Phone number must be exactly 10 digits".into(),
            email: "Please enter a valid email address".into(),
            past_date: "Travel date cannot be in the past".into(),
        }
    }
}

/// Class names written onto fields and forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClasses {
    pub valid: String,
    pub invalid: String,
    pub validated: String,
}

impl Default for MarkerClasses {
    fn default() -> Self {
        Self {
            valid: "is-valid".into(),
            invalid: "is-invalid".into(),
            validated: "was-validated".into(),
        }
    }
}

/// Where "today" comes from for future-date checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Local calendar date of the running system.
    #[default]
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System => Local::now().date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardConfig {
    pub messages: Messages,
    pub markers: MarkerClasses,
    pub clock: Clock,
}

impl GuardConfig {
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.clock = Clock::Fixed(today);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, class) in [
            ("valid", &self.markers.valid),
            ("invalid", &self.markers.invalid),
            ("validated", &self.markers.validated),
        ] {
            if class.is_empty() || class.chars().any(char::is_whitespace) {
                return Err(Error::InvalidConfig(format!(
                    "{name} marker class must be a single non-empty token, got {class:?}"
                )));
            }
        }
        if self.markers.valid == self.markers.invalid {
            return Err(Error::InvalidConfig(format!(
                "valid and invalid marker classes must differ, both are {:?}",
                self.markers.valid
            )));
        }
        for (name, message) in [
            ("phone", &self.messages.phone),
            ("email", &self.messages.email),
            ("past_date", &self.messages.past_date),
        ] {
            // An empty custom validity message would leave the field valid.
            if message.is_empty() {
                return Err(Error::InvalidConfig(format!("{name} message must not be empty")));
            }
        }
        Ok(())
    }
}
