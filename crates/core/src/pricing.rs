//! Price resolution.
//!
//! A cart line's unit price is resolved once, when the line is first created,
//! and frozen into the line. Later catalog edits never reprice a line.

use rust_decimal::Decimal;

use crate::catalog::{Portion, Product, Variant};
use crate::types::ProductType;

/// Errors from resolving a product + variant into a price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The product has no price usable for its type.
    #[error("{product} has no usable price")]
    MissingPrice { product: String },
    /// A catering product with portion prices needs a portion.
    #[error("choose a portion for {product}")]
    PortionRequired { product: String },
    /// The chosen portion has no price.
    #[error("{portion} portion is not offered for {product}")]
    PortionUnavailable { product: String, portion: Portion },
    /// A sized fashion product needs a size.
    #[error("choose a size for {product}")]
    SizeRequired { product: String },
    /// The chosen size is not in the product's size list.
    #[error("size {size} is not offered for {product}")]
    UnknownSize { product: String, size: String },
    /// The variant kind does not fit the product type.
    #[error("{product} does not take that kind of option")]
    VariantMismatch { product: String },
}

/// A product resolved into the values frozen into a cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Size or portion label, `None` for products without variants.
    pub variant_key: Option<String>,
    /// Display name; catering portions are appended as `"Jollof (Full)"`.
    pub name: String,
    pub unit_price: Decimal,
}

/// Resolve the unit price of `product` for the chosen `variant`.
///
/// # Errors
///
/// Returns a [`PriceError`] when no price can be resolved or the variant
/// does not fit the product. Nothing is written in that case.
pub fn resolve(product: &Product, variant: Option<&Variant>) -> Result<ResolvedLine, PriceError> {
    match product.product_type {
        ProductType::Fashion => resolve_fashion(product, variant),
        ProductType::Catering => resolve_catering(product, variant),
    }
}

fn resolve_fashion(product: &Product, variant: Option<&Variant>) -> Result<ResolvedLine, PriceError> {
    let unit_price = product
        .discounted_price
        .or(product.price)
        .ok_or_else(|| PriceError::MissingPrice {
            product: product.name.clone(),
        })?;

    let variant_key = match variant {
        Some(Variant::Size(size)) => {
            let size = size.trim();
            if !product.sizes.iter().any(|s| s == size) {
                return Err(PriceError::UnknownSize {
                    product: product.name.clone(),
                    size: size.to_owned(),
                });
            }
            Some(size.to_owned())
        }
        Some(Variant::Portion(_)) => {
            return Err(PriceError::VariantMismatch {
                product: product.name.clone(),
            });
        }
        None if !product.sizes.is_empty() => {
            return Err(PriceError::SizeRequired {
                product: product.name.clone(),
            });
        }
        None => None,
    };

    Ok(ResolvedLine {
        variant_key,
        name: product.name.clone(),
        unit_price,
    })
}

fn resolve_catering(
    product: &Product,
    variant: Option<&Variant>,
) -> Result<ResolvedLine, PriceError> {
    if !product.has_portion_pricing() {
        // Single-priced dish: any selection is irrelevant.
        let unit_price = product.price.ok_or_else(|| PriceError::MissingPrice {
            product: product.name.clone(),
        })?;
        return Ok(ResolvedLine {
            variant_key: None,
            name: product.name.clone(),
            unit_price,
        });
    }

    let portion = match variant {
        Some(Variant::Portion(portion)) => *portion,
        Some(Variant::Size(_)) => {
            return Err(PriceError::VariantMismatch {
                product: product.name.clone(),
            });
        }
        None => {
            return Err(PriceError::PortionRequired {
                product: product.name.clone(),
            });
        }
    };

    let price = match portion {
        Portion::Full => product.full_price,
        Portion::Half => product.half_price,
    };
    let unit_price = price.ok_or_else(|| PriceError::PortionUnavailable {
        product: product.name.clone(),
        portion,
    })?;

    Ok(ResolvedLine {
        variant_key: Some(portion.label().to_owned()),
        name: format!("{} ({portion})", product.name),
        unit_price,
    })
}

/// Portion pre-selected for a catering product: `Full` when offered,
/// otherwise `Half`, otherwise none.
#[must_use]
pub fn default_portion(product: &Product) -> Option<Portion> {
    if product.full_price.is_some() {
        Some(Portion::Full)
    } else if product.half_price.is_some() {
        Some(Portion::Half)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    #[test]
    fn test_fashion_prefers_discounted_price() {
        let mut dress = fixtures::fashion("dress", "Ankara Dress", Decimal::from(80), &["S", "M"]);
        dress.original_price = Some(Decimal::from(80));
        dress.discounted_price = Some(Decimal::new(6499, 2));

        let line = resolve(&dress, Some(&Variant::Size("M".to_owned()))).unwrap();
        assert_eq!(line.unit_price, Decimal::new(6499, 2));
        assert_eq!(line.variant_key.as_deref(), Some("M"));
        assert_eq!(line.name, "Ankara Dress");
    }

    #[test]
    fn test_fashion_size_rules() {
        let dress = fixtures::fashion("dress", "Ankara Dress", Decimal::from(80), &["S", "M"]);
        assert!(matches!(
            resolve(&dress, None),
            Err(PriceError::SizeRequired { .. })
        ));
        assert!(matches!(
            resolve(&dress, Some(&Variant::Size("XXL".to_owned()))),
            Err(PriceError::UnknownSize { .. })
        ));

        let scarf = fixtures::fashion("scarf", "Silk Scarf", Decimal::from(15), &[]);
        let line = resolve(&scarf, None).unwrap();
        assert_eq!(line.variant_key, None);
        assert_eq!(line.unit_price, Decimal::from(15));
    }

    #[test]
    fn test_catering_portion_price() {
        let jollof = fixtures::catering("jollof", "Jollof", Some(40), Some(25));
        let line = resolve(&jollof, Some(&Variant::Portion(Portion::Half))).unwrap();
        assert_eq!(line.unit_price, Decimal::from(25));
        assert_eq!(line.variant_key.as_deref(), Some("Half"));
        assert_eq!(line.name, "Jollof (Half)");
    }

    #[test]
    fn test_catering_portion_required_and_available() {
        let jollof = fixtures::catering("jollof", "Jollof", Some(40), None);
        assert!(matches!(
            resolve(&jollof, None),
            Err(PriceError::PortionRequired { .. })
        ));
        assert_eq!(
            resolve(&jollof, Some(&Variant::Portion(Portion::Half))),
            Err(PriceError::PortionUnavailable {
                product: "Jollof".to_owned(),
                portion: Portion::Half,
            })
        );
    }

    #[test]
    fn test_catering_generic_price_ignores_variant() {
        let mut puff = fixtures::catering("puff", "Puff Puff", None, None);
        puff.price = Some(Decimal::from(12));
        let line = resolve(&puff, Some(&Variant::Portion(Portion::Full))).unwrap();
        assert_eq!(line.unit_price, Decimal::from(12));
        assert_eq!(line.variant_key, None);
    }

    #[test]
    fn test_missing_price() {
        let empty = fixtures::catering("air", "Air", None, None);
        assert!(matches!(
            resolve(&empty, None),
            Err(PriceError::MissingPrice { .. })
        ));
    }

    #[test]
    fn test_default_portion() {
        assert_eq!(
            default_portion(&fixtures::catering("a", "A", Some(1), Some(1))),
            Some(Portion::Full)
        );
        assert_eq!(
            default_portion(&fixtures::catering("a", "A", None, Some(1))),
            Some(Portion::Half)
        );
        assert_eq!(default_portion(&fixtures::catering("a", "A", None, None)), None);
    }
}
