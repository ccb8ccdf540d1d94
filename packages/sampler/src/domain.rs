//! Observed value domains and the neighborhood → city index.

use std::collections::{BTreeMap, BTreeSet};

use crime_risk_crime_models::Context;
use rand::Rng;
use rand::seq::SliceRandom;

/// The values each context dimension actually took in the source data.
///
/// Every domain is sorted so sampling with a fixed seed is reproducible
/// regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedDomains {
    /// Observed days of week.
    pub day_of_week: Vec<u8>,
    /// Observed hours.
    pub hour: Vec<u8>,
    /// Observed months.
    pub month: Vec<u8>,
    /// Observed years.
    pub year: Vec<i32>,
    /// Observed neighborhood codes.
    pub neighborhood: Vec<u32>,
    /// Observed city codes.
    pub city: Vec<u32>,
    /// Observed crime type codes.
    pub crime_type: Vec<u32>,
}

impl ObservedDomains {
    /// Collects the domains of `contexts`.
    pub fn collect<'a, I>(contexts: I) -> Self
    where
        I: IntoIterator<Item = &'a Context>,
    {
        let mut day_of_week = BTreeSet::new();
        let mut hour = BTreeSet::new();
        let mut month = BTreeSet::new();
        let mut year = BTreeSet::new();
        let mut neighborhood = BTreeSet::new();
        let mut city = BTreeSet::new();
        let mut crime_type = BTreeSet::new();

        for context in contexts {
            day_of_week.insert(context.day_of_week);
            hour.insert(context.hour);
            month.insert(context.month);
            year.insert(context.year);
            neighborhood.insert(context.neighborhood);
            city.insert(context.city);
            crime_type.insert(context.crime_type);
        }

        Self {
            day_of_week: day_of_week.into_iter().collect(),
            hour: hour.into_iter().collect(),
            month: month.into_iter().collect(),
            year: year.into_iter().collect(),
            neighborhood: neighborhood.into_iter().collect(),
            city: city.into_iter().collect(),
            crime_type: crime_type.into_iter().collect(),
        }
    }

    /// Number of distinct contexts the domains can produce when every
    /// dimension is sampled independently.
    #[must_use]
    pub fn cardinality(&self) -> u128 {
        [
            self.day_of_week.len(),
            self.hour.len(),
            self.month.len(),
            self.year.len(),
            self.neighborhood.len(),
            self.city.len(),
            self.crime_type.len(),
        ]
        .iter()
        .map(|&n| n as u128)
        .product()
    }

    /// Draws one context, each dimension uniformly from its domain.
    ///
    /// With `cities`, the city is not drawn: it is the indexed city of the
    /// drawn neighborhood. Returns `None` if any domain is empty.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        cities: Option<&NeighborhoodCityIndex>,
    ) -> Option<Context> {
        let day_of_week = *self.day_of_week.choose(rng)?;
        let hour = *self.hour.choose(rng)?;
        let month = *self.month.choose(rng)?;
        let year = *self.year.choose(rng)?;
        let neighborhood = *self.neighborhood.choose(rng)?;
        let city = match cities {
            Some(index) => index.city_of(neighborhood)?,
            None => *self.city.choose(rng)?,
        };
        let crime_type = *self.crime_type.choose(rng)?;

        Some(Context {
            day_of_week,
            hour,
            month,
            year,
            neighborhood,
            city,
            crime_type,
        })
    }
}

/// Maps each neighborhood code to the one city it belongs to.
///
/// Learned from the real rows. A neighborhood seen under several cities
/// is assigned the city it was seen with most often; ties go to the
/// lowest city code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborhoodCityIndex {
    cities: BTreeMap<u32, u32>,
}

impl NeighborhoodCityIndex {
    /// Learns the index from observed contexts (duplicates count).
    pub fn learn<'a, I>(contexts: I) -> Self
    where
        I: IntoIterator<Item = &'a Context>,
    {
        let mut counts: BTreeMap<u32, BTreeMap<u32, usize>> = BTreeMap::new();
        for context in contexts {
            *counts
                .entry(context.neighborhood)
                .or_default()
                .entry(context.city)
                .or_default() += 1;
        }

        let cities = counts
            .into_iter()
            .filter_map(|(neighborhood, by_city)| {
                if by_city.len() > 1 {
                    log::warn!(
                        "Neighborhood {neighborhood} observed in {} cities; using the most frequent",
                        by_city.len()
                    );
                }
                let mut best: Option<(u32, usize)> = None;
                for (city, count) in by_city {
                    if best.is_none_or(|(_, best_count)| count > best_count) {
                        best = Some((city, count));
                    }
                }
                best.map(|(city, _)| (neighborhood, city))
            })
            .collect();

        Self { cities }
    }

    /// Returns the city code for `neighborhood`.
    #[must_use]
    pub fn city_of(&self, neighborhood: u32) -> Option<u32> {
        self.cities.get(&neighborhood).copied()
    }

    /// Iterates `(neighborhood, city)` pairs in neighborhood order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.cities.iter().map(|(n, c)| (*n, *c))
    }

    /// Number of indexed neighborhoods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Returns `true` if nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx(hour: u8, neighborhood: u32, city: u32) -> Context {
        Context {
            day_of_week: 1,
            hour,
            month: 3,
            year: 2024,
            neighborhood,
            city,
            crime_type: 0,
        }
    }

    #[test]
    fn domains_are_sorted_and_distinct() {
        let contexts = [ctx(22, 3, 1), ctx(8, 1, 0), ctx(22, 1, 0)];
        let domains = ObservedDomains::collect(&contexts);
        assert_eq!(domains.hour, vec![8, 22]);
        assert_eq!(domains.neighborhood, vec![1, 3]);
        assert_eq!(domains.city, vec![0, 1]);
        assert_eq!(domains.year, vec![2024]);
        assert_eq!(domains.cardinality(), 8);
    }

    #[test]
    fn samples_stay_inside_observed_domains() {
        let contexts = [ctx(22, 3, 1), ctx(8, 1, 0), ctx(13, 2, 0)];
        let domains = ObservedDomains::collect(&contexts);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let sampled = domains.sample(&mut rng, None).unwrap();
            assert!(domains.hour.contains(&sampled.hour));
            assert!(domains.neighborhood.contains(&sampled.neighborhood));
            assert!(domains.city.contains(&sampled.city));
        }
    }

    #[test]
    fn empty_domains_sample_nothing() {
        let domains = ObservedDomains::collect(&[]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(domains.sample(&mut rng, None).is_none());
    }

    #[test]
    fn index_uses_majority_city_with_lowest_code_on_ties() {
        let contexts = [
            ctx(1, 0, 2),
            ctx(2, 0, 1),
            ctx(3, 0, 1),
            ctx(1, 5, 4),
            ctx(1, 5, 3),
        ];
        let index = NeighborhoodCityIndex::learn(&contexts);
        assert_eq!(index.city_of(0), Some(1));
        assert_eq!(index.city_of(5), Some(3));
        assert_eq!(index.city_of(9), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn indexed_sampling_pairs_neighborhood_with_its_city() {
        let contexts = [ctx(1, 0, 0), ctx(2, 1, 0), ctx(3, 2, 1), ctx(4, 3, 1)];
        let domains = ObservedDomains::collect(&contexts);
        let index = NeighborhoodCityIndex::learn(&contexts);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..200 {
            let sampled = domains.sample(&mut rng, Some(&index)).unwrap();
            assert_eq!(Some(sampled.city), index.city_of(sampled.neighborhood));
        }
    }
}
