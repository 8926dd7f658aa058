use super::ValidationError;
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Product {
    Workstation,
    Server,
    Cloud,
    NonProduct,
}

impl Product {
    pub const ALL: [Product; 4] =
        [Product::Workstation, Product::Server, Product::Cloud, Product::NonProduct];

    /// Comma-separated names of every product.
    pub fn names() -> String {
        Product::ALL.iter().map(|p| <&'static str>::from(*p)).collect::<Vec<_>>().join(", ")
    }
}

impl From<Product> for &'static str {
    fn from(product: Product) -> Self {
        match product {
            Product::Workstation => "workstation",
            Product::Server => "server",
            Product::Cloud => "cloud",
            Product::NonProduct => "nonproduct",
        }
    }
}

impl Display for Product {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(<&'static str>::from(*self))
    }
}

impl FromStr for Product {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Product::ALL
            .iter()
            .copied()
            .find(|p| <&'static str>::from(*p) == input)
            .ok_or_else(|| ValidationError::InvalidProduct(input.to_owned()))
    }
}
