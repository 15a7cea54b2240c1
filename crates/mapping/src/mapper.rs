//! Matching bundle variants to component variants by option values.
//!
//! Each bundle variant is reduced to its *value blob*, the normalized
//! concatenation of its option values. A component variant matches when every
//! one of its normalized option values occurs in that blob, so bundle labels may
//! carry extra words ("Obsidian Black" still matches "Black").

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use duobundle_products::{ComponentMapping, Variant};

use crate::error::MappingError;

/// How to choose among several matching component variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// The first matching variant in component order.
    #[default]
    FirstMatch,
    /// The matching variant with the longest normalized option values;
    /// ties go to the earlier variant.
    MostSpecific,
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_match" => Ok(Self::FirstMatch),
            "most_specific" | "specific" => Ok(Self::MostSpecific),
            other => Err(format!(
                "unknown match strategy '{other}' (expected 'first' or 'most_specific')"
            )),
        }
    }
}

/// The role a product plays in a bundle, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRole {
    Bundle,
    FirstComponent,
    SecondComponent,
}

impl core::fmt::Display for ProductRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ProductRole::Bundle => "bundle product",
            ProductRole::FirstComponent => "first component product",
            ProductRole::SecondComponent => "second component product",
        })
    }
}

/// A component variant with its normalized values computed once.
struct Candidate<'a> {
    variant: &'a Variant,
    values: Vec<String>,
    specificity: usize,
}

impl<'a> Candidate<'a> {
    fn new(variant: &'a Variant) -> Self {
        let values = variant.normalized_values();
        let specificity = values.iter().map(|v| v.chars().count()).sum();
        Self {
            variant,
            values,
            specificity,
        }
    }

    fn matches(&self, blob: &str) -> bool {
        self.values.iter().all(|v| blob.contains(v.as_str()))
    }
}

/// Candidates of one component product.
enum Component<'a> {
    /// Single variant without real options: matches every bundle variant.
    Default(&'a Variant),
    Candidates(Vec<Candidate<'a>>),
}

impl<'a> Component<'a> {
    fn new(variants: &'a [Variant]) -> Self {
        match variants {
            [only] if only.is_default() => Component::Default(only),
            _ => Component::Candidates(variants.iter().map(Candidate::new).collect()),
        }
    }

    fn pick(&self, blob: &str, strategy: MatchStrategy) -> Option<&'a Variant> {
        let candidates = match self {
            Component::Default(only) => return Some(*only),
            Component::Candidates(c) => c,
        };

        let mut matching = candidates.iter().filter(|c| c.matches(blob));
        let chosen = match strategy {
            MatchStrategy::FirstMatch => matching.next(),
            MatchStrategy::MostSpecific => {
                matching.reduce(|best, c| if c.specificity > best.specificity { c } else { best })
            }
        };
        chosen.map(|c| c.variant)
    }
}

/// Pure variant mapper.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantMapper {
    strategy: MatchStrategy,
}

impl VariantMapper {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Map every bundle variant to one variant of each component.
    ///
    /// Fails as a whole when any bundle variant is left unmatched; the error
    /// lists each such variant by value blob (or by id when it has no option
    /// values). Returns one mapping per bundle variant, in bundle order.
    pub fn map(
        &self,
        bundle: &[Variant],
        first: &[Variant],
        second: &[Variant],
    ) -> Result<Vec<ComponentMapping>, MappingError> {
        for (role, variants) in [
            (ProductRole::Bundle, bundle),
            (ProductRole::FirstComponent, first),
            (ProductRole::SecondComponent, second),
        ] {
            if variants.is_empty() {
                return Err(MappingError::NoVariants(role));
            }
        }

        let first = Component::new(first);
        let second = Component::new(second);

        let mut mappings = Vec::with_capacity(bundle.len());
        let mut unmapped = Vec::new();

        for variant in bundle {
            let blob = variant.value_blob();
            match (
                first.pick(&blob, self.strategy),
                second.pick(&blob, self.strategy),
            ) {
                (Some(a), Some(b)) => mappings.push(ComponentMapping::new(
                    variant.id.clone(),
                    a.id.clone(),
                    b.id.clone(),
                )),
                _ if blob.is_empty() => unmapped.push(variant.id.to_string()),
                _ => unmapped.push(blob),
            }
        }

        if !unmapped.is_empty() {
            return Err(MappingError::Unmapped { unmapped });
        }

        Ok(mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duobundle_core::GlobalId;
    use duobundle_products::SelectedOption;

    fn vid(n: u64) -> GlobalId {
        GlobalId::variant(n).unwrap()
    }

    fn variant(id: u64, options: &[(&str, &str)]) -> Variant {
        Variant::new(
            vid(id),
            options
                .iter()
                .map(|(n, v)| SelectedOption::new(*n, *v))
                .collect(),
        )
    }

    fn default_variant(id: u64) -> Variant {
        variant(id, &[("Title", "Default Title")])
    }

    fn mapper() -> VariantMapper {
        VariantMapper::default()
    }

    #[test]
    fn single_default_components_map_regardless_of_text() {
        let bundle = vec![variant(100, &[("Title", "Something Else Entirely")])];
        let mappings = mapper()
            .map(&bundle, &[default_variant(1)], &[default_variant(2)])
            .unwrap();

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].bundle_variant_id(), &vid(100));
        assert_eq!(mappings[0].components(), &[vid(1), vid(2)]);
    }

    #[test]
    fn containment_tolerates_extra_words_on_bundle_side() {
        let bundle = vec![variant(100, &[("Color", "Obsidian Black")])];
        let first = vec![variant(1, &[("Color", "black")])];
        let mappings = mapper().map(&bundle, &first, &[default_variant(2)]).unwrap();
        assert_eq!(mappings[0].components(), &[vid(1), vid(2)]);
    }

    #[test]
    fn non_matching_value_is_reported_unmapped() {
        let bundle = vec![variant(100, &[("Color", "Obsidian Black")])];
        let first = vec![variant(1, &[("Color", "Blue")])];
        let err = mapper().map(&bundle, &first, &[default_variant(2)]).unwrap_err();
        assert_eq!(
            err,
            MappingError::Unmapped {
                unmapped: vec!["obsidian black".to_string()]
            }
        );
    }

    #[test]
    fn every_component_value_must_be_contained() {
        let bundle = vec![variant(100, &[("Color", "Black"), ("Size", "Large")])];
        let first = vec![
            variant(1, &[("Color", "Black"), ("Size", "Small")]),
            variant(2, &[("Color", "Black"), ("Size", "Large")]),
        ];
        let mappings = mapper().map(&bundle, &first, &[default_variant(9)]).unwrap();
        assert_eq!(mappings[0].components()[0], vid(2));
    }

    #[test]
    fn maps_cartesian_bundle_of_two_optioned_components() {
        let first = vec![
            variant(1, &[("Color", "Black")]),
            variant(2, &[("Color", "White")]),
        ];
        let second = vec![variant(11, &[("Size", "S")]), variant(12, &[("Size", "M")])];
        let bundle = vec![
            variant(101, &[("Color", "Black"), ("Size", "S")]),
            variant(102, &[("Color", "Black"), ("Size", "M")]),
            variant(103, &[("Color", "White"), ("Size", "S")]),
            variant(104, &[("Color", "White"), ("Size", "M")]),
        ];

        let mappings = mapper().map(&bundle, &first, &second).unwrap();
        let pairs: Vec<_> = mappings.iter().map(|m| m.components().to_vec()).collect();
        assert_eq!(
            pairs,
            vec![
                vec![vid(1), vid(11)],
                vec![vid(1), vid(12)],
                vec![vid(2), vid(11)],
                vec![vid(2), vid(12)],
            ]
        );
    }

    #[test]
    fn any_unmapped_variant_fails_the_whole_operation() {
        let first = vec![variant(1, &[("Color", "Black")])];
        let bundle = vec![
            variant(101, &[("Color", "Black")]),
            variant(102, &[("Color", "Sand")]),
            variant(103, &[]),
        ];
        let second = vec![variant(11, &[("Color", "Black")]), variant(12, &[("Color", "Red")])];

        let err = mapper().map(&bundle, &first, &second).unwrap_err();
        assert_eq!(
            err,
            MappingError::Unmapped {
                unmapped: vec!["sand".to_string(), vid(103).to_string()]
            }
        );
    }

    #[test]
    fn empty_variant_lists_fail_fast() {
        let one = vec![variant(1, &[("Color", "Black")])];
        assert_eq!(
            mapper().map(&[], &one, &one).unwrap_err(),
            MappingError::NoVariants(ProductRole::Bundle)
        );
        assert_eq!(
            mapper().map(&one, &[], &one).unwrap_err(),
            MappingError::NoVariants(ProductRole::FirstComponent)
        );
        assert_eq!(
            mapper().map(&one, &one, &[]).unwrap_err(),
            MappingError::NoVariants(ProductRole::SecondComponent)
        );
    }

    #[test]
    fn first_match_wins_by_default() {
        let bundle = vec![variant(100, &[("Color", "Obsidian Black")])];
        let first = vec![
            variant(1, &[("Color", "Black")]),
            variant(2, &[("Color", "Obsidian Black")]),
        ];
        let mappings = mapper().map(&bundle, &first, &[default_variant(9)]).unwrap();
        assert_eq!(mappings[0].components()[0], vid(1));
    }

    #[test]
    fn most_specific_prefers_longest_match_and_keeps_order_on_ties() {
        let bundle = vec![variant(100, &[("Color", "Obsidian Black")])];
        let first = vec![
            variant(1, &[("Color", "Black")]),
            variant(2, &[("Color", "Obsidian Black")]),
            variant(3, &[("Color", "Obsidian-Black")]),
        ];
        let mappings = VariantMapper::new(MatchStrategy::MostSpecific)
            .map(&bundle, &first, &[default_variant(9)])
            .unwrap();
        assert_eq!(mappings[0].components()[0], vid(2));
    }

    #[test]
    fn match_strategy_parses_config_values() {
        assert_eq!("first".parse::<MatchStrategy>(), Ok(MatchStrategy::FirstMatch));
        assert_eq!(" Most_Specific ".parse::<MatchStrategy>(), Ok(MatchStrategy::MostSpecific));
        assert!("longest".parse::<MatchStrategy>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: two default-variant components map any bundle variant.
            #[test]
            fn default_components_always_map(label in ".{0,30}") {
                let bundle = vec![variant(100, &[("Style", label.as_str())])];
                let mappings = mapper()
                    .map(&bundle, &[default_variant(1)], &[default_variant(2)])
                    .unwrap();
                prop_assert_eq!(mappings.len(), 1);
                prop_assert_eq!(mappings[0].components(), &[vid(1), vid(2)][..]);
            }

            /// Property: a component value is found inside any blob that embeds it.
            #[test]
            fn embedded_values_match(
                prefix in "[a-z]{0,8}",
                value in "[a-z]{1,8}",
                suffix in "[a-z]{0,8}"
            ) {
                let label = format!("{prefix} {value} {suffix}");
                let bundle = vec![variant(100, &[("Color", label.as_str())])];
                let first = vec![variant(1, &[("Color", value.as_str())])];
                let result = mapper().map(&bundle, &first, &[default_variant(2)]);
                prop_assert!(result.is_ok());
            }
        }
    }
}
