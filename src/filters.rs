//! Search-filter form state and client-side validation.
//!
//! Validation mirrors the backend limits and runs before any request is
//! issued; the first failing check wins.

#[derive(Clone, Debug, PartialEq)]
pub struct SearchFilters {
    pub ra: f64,
    pub dec: f64,
    pub radius_arcmin: f64,
    pub mag_min: f64,
    pub mag_max: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub dist_min: f64,
    pub dist_max: f64,
    pub observatory: String,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            ra: 0.0,
            dec: 0.0,
            radius_arcmin: 15.0,
            mag_min: 6.0,
            mag_max: 15.0,
            temp_min: 3000.0,
            temp_max: 7500.0,
            dist_min: 10.0,
            dist_max: 500.0,
            observatory: String::new(),
        }
    }
}

impl SearchFilters {
    pub fn validate(&self) -> Result<(), String> {
        validate_ra(self.ra)?;
        validate_dec(self.dec)?;
        validate_radius(self.radius_arcmin)?;
        Ok(())
    }

    /// Query parameters for `/search`; the observatory is omitted when unset.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ra", format!("{}", self.ra)),
            ("dec", format!("{}", self.dec)),
            ("radius", format!("{}", self.radius_arcmin)),
            ("mag_min", format!("{}", self.mag_min)),
            ("mag_max", format!("{}", self.mag_max)),
            ("temp_min", format!("{}", self.temp_min)),
            ("temp_max", format!("{}", self.temp_max)),
            ("dist_min", format!("{}", self.dist_min)),
            ("dist_max", format!("{}", self.dist_max)),
        ];
        if !self.observatory.is_empty() {
            params.push(("obs", self.observatory.clone()));
        }
        params
    }
}

pub fn validate_ra(ra: f64) -> Result<(), String> {
    if !ra.is_finite() || !(0.0..360.0).contains(&ra) {
        Err("Right Ascension must be between 0° and 360°".to_string())
    } else {
        Ok(())
    }
}

pub fn validate_dec(dec: f64) -> Result<(), String> {
    if !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
        Err("Declination must be between -90° and +90°".to_string())
    } else {
        Ok(())
    }
}

pub fn validate_radius(radius_arcmin: f64) -> Result<(), String> {
    if !radius_arcmin.is_finite() || radius_arcmin <= 0.0 || radius_arcmin > 30.0 {
        Err("Radius must be between 0.01 and 30 arcmin".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SearchFilters::default().validate().is_ok());
    }

    #[test]
    fn ra_bounds() {
        assert!(validate_ra(0.0).is_ok());
        assert!(validate_ra(359.999).is_ok());
        assert!(validate_ra(360.0).is_err());
        assert!(validate_ra(-0.1).is_err());
        assert!(validate_ra(f64::NAN).is_err());
    }

    #[test]
    fn dec_bounds() {
        assert!(validate_dec(-90.0).is_ok());
        assert!(validate_dec(90.0).is_ok());
        assert!(validate_dec(90.5).is_err());
    }

    #[test]
    fn radius_bounds() {
        assert!(validate_radius(0.01).is_ok());
        assert!(validate_radius(30.0).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(30.1).is_err());
    }

    #[test]
    fn first_failing_check_wins() {
        let mut filters = SearchFilters {
            ra: 400.0,
            dec: 95.0,
            ..SearchFilters::default()
        };
        assert!(filters.validate().unwrap_err().contains("Right Ascension"));
        filters.ra = 10.0;
        assert!(filters.validate().unwrap_err().contains("Declination"));
    }

    #[test]
    fn observatory_is_omitted_when_empty() {
        let filters = SearchFilters::default();
        assert!(filters.query_params().iter().all(|(key, _)| *key != "obs"));

        let filters = SearchFilters {
            observatory: "tess".to_string(),
            ..SearchFilters::default()
        };
        let params = filters.query_params();
        assert_eq!(params.last().unwrap(), &("obs", "tess".to_string()));
    }

    #[test]
    fn query_covers_every_range_filter() {
        let params = SearchFilters::default().query_params();
        let keys: Vec<&str> = params.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            keys,
            vec![
                "ra", "dec", "radius", "mag_min", "mag_max", "temp_min", "temp_max", "dist_min",
                "dist_max",
            ]
        );
    }
}
