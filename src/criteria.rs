//! Derivation of comparable-search ranges from the subject property.

use crate::config::SearchTolerances;
use crate::subject::SubjectProperty;

/// Inclusive numeric ranges submitted to the comparable search form.
///
/// Square footage and acreage lower bounds are clamped at zero; bed and bath
/// offsets default to zero, producing an exact-match range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchCriteria {
    pub beds_min: i64,
    pub beds_max: i64,
    pub baths_min: i64,
    pub baths_max: i64,
    pub sqft_min: i64,
    pub sqft_max: i64,
    pub acres_min: f64,
    pub acres_max: f64,
    pub year_min: i64,
    pub year_max: i64,
}

impl SearchCriteria {
    pub fn build(subject: &SubjectProperty, tolerances: &SearchTolerances) -> Self {
        Self {
            beds_min: subject.beds + tolerances.bedrooms.min_offset,
            beds_max: subject.beds + tolerances.bedrooms.max_offset,
            baths_min: subject.baths + tolerances.bathrooms.min_offset,
            baths_max: subject.baths + tolerances.bathrooms.max_offset,
            sqft_min: (subject.sqft - tolerances.sqft.offset).max(0),
            sqft_max: subject.sqft + tolerances.sqft.offset,
            acres_min: (subject.acres - tolerances.acres.offset).max(0.0),
            acres_max: subject.acres + tolerances.acres.offset,
            year_min: subject.year_built - tolerances.year_built.offset,
            year_max: subject.year_built + tolerances.year_built.offset,
        }
    }

    // The search form takes each range as a single "min-max" text input.

    pub fn beds_range(&self) -> String {
        format!("{}-{}", self.beds_min, self.beds_max)
    }

    pub fn baths_range(&self) -> String {
        format!("{}-{}", self.baths_min, self.baths_max)
    }

    pub fn sqft_range(&self) -> String {
        format!("{}-{}", self.sqft_min, self.sqft_max)
    }

    pub fn acres_range(&self) -> String {
        format!("{}-{}", self.acres_min, self.acres_max)
    }

    pub fn year_range(&self) -> String {
        format!("{}-{}", self.year_min, self.year_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectProperty {
        SubjectProperty {
            beds: 3,
            baths: 2,
            sqft: 1500,
            acres: 0.2,
            year_built: 2000,
        }
    }

    #[test]
    fn default_tolerances_produce_documented_ranges() {
        let c = SearchCriteria::build(&subject(), &SearchTolerances::default());
        assert_eq!(c.beds_range(), "3-3");
        assert_eq!(c.baths_range(), "2-2");
        assert_eq!(c.sqft_range(), "1400-1600");
        assert_eq!(c.acres_range(), "0-10.2");
        assert_eq!(c.year_range(), "1995-2005");
    }

    #[test]
    fn sqft_lower_bound_clamps_at_zero() {
        let mut small = subject();
        small.sqft = 50;
        let c = SearchCriteria::build(&small, &SearchTolerances::default());
        assert_eq!(c.sqft_min, 0);
        assert_eq!(c.sqft_max, 150);
    }

    #[test]
    fn bed_offsets_widen_the_range() {
        let mut tolerances = SearchTolerances::default();
        tolerances.bedrooms.min_offset = -1;
        tolerances.bedrooms.max_offset = 2;
        let c = SearchCriteria::build(&subject(), &tolerances);
        assert_eq!(c.beds_range(), "2-5");
    }
}
