//! Configuration lookup port, keyed by INI section and key.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// Raw value is present but does not parse as a number.
    fn is_non_numeric(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key)
            .is_some_and(|v| v.trim().parse::<f64>().is_err())
    }
}
