//! # Cart Provider
//!
//! How the orchestrator reads the cart. The storefront owns the cart; the
//! checkout only needs its lines and subtotal.

use std::sync::{Arc, Mutex, PoisonError};

use storefront_core::{Cart, LineItem, Money};

/// Read access to the customer's cart.
pub trait CartProvider: Send + Sync {
    fn items(&self) -> Vec<LineItem>;
    fn subtotal(&self) -> Money;
}

/// Cart shared between the storefront and the checkout.
///
/// ## Thread Safety
/// `Arc<Mutex<Cart>>`: cart operations are short and mostly writes, so a
/// plain mutex is enough.
#[derive(Debug, Clone, Default)]
pub struct SharedCart {
    cart: Arc<Mutex<Cart>>,
}

impl SharedCart {
    pub fn new(cart: Cart) -> Self {
        SharedCart {
            cart: Arc::new(Mutex::new(cart)),
        }
    }

    /// Executes a function with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust
    /// use storefront_checkout::cart::SharedCart;
    /// use storefront_core::Money;
    ///
    /// let cart = SharedCart::default();
    /// cart.with_cart_mut(|c| c.add_item("lamp", "Floor Lamp", Money::from_cents(15_000), 1))
    ///     .unwrap();
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }
}

impl CartProvider for SharedCart {
    fn items(&self) -> Vec<LineItem> {
        self.with_cart(|cart| cart.items().to_vec())
    }

    fn subtotal(&self) -> Money {
        self.with_cart(Cart::subtotal)
    }
}
