//! Catalog and cart commands.

use lumina_core::{CustomerId, PaymentMethod, ProductId, UserDraft};
use lumina_storefront::StorefrontError;
use lumina_storefront::auth::AuthError;
use lumina_storefront::backend::Product;
use lumina_storefront::checkout::{
    Cart, CheckoutError, MarketplaceOrderRequest, ShippingAddress, place_order,
};

use super::{Context, PaymentAnswer};

/// Shipping fields from the command line.
#[derive(Debug, Clone)]
pub struct ShippingArgs {
    pub name: String,
    pub phone: String,
    pub pincode: String,
    pub address: String,
}

async fn find_product(ctx: &Context, product_id: ProductId) -> Result<Product, StorefrontError> {
    ctx.backend
        .list_products()
        .await?
        .iter()
        .find(|product| product.id == product_id)
        .cloned()
        .ok_or_else(|| StorefrontError::Input(format!("no product with id {product_id}")))
}

/// List the catalog.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn products(ctx: &Context, refresh: bool) -> Result<(), StorefrontError> {
    if refresh {
        ctx.backend.invalidate_products().await;
    }
    let currency = ctx.config.checkout.currency;
    let products = ctx.backend.list_products().await?;

    if products.is_empty() {
        println!("No products");
        return Ok(());
    }
    for product in products.iter() {
        let stock = if product.stock_qty > 0 {
            format!("{} in stock", product.stock_qty)
        } else {
            "out of stock".to_string()
        };
        println!(
            "{:>5}  {:<40} {:>12}  {stock}",
            product.id,
            product.name,
            product.unit_price(currency).to_string(),
        );
    }
    Ok(())
}

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the local state cannot be read.
#[allow(clippy::print_stdout)]
pub async fn show_cart(ctx: &Context) -> Result<(), StorefrontError> {
    let cart = ctx.sessions.cart().await?;
    if cart.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }

    for line in cart.lines() {
        println!(
            "{:>5}  {:<40} x{:<4} {}",
            line.product_id,
            line.name,
            line.quantity,
            line.line_total()
        );
    }
    println!(
        "{} item(s), subtotal {}",
        cart.item_count(),
        cart.subtotal(ctx.config.checkout.currency)
    );
    Ok(())
}

/// Add `quantity` of a product, checking stock for the resulting line.
///
/// # Errors
///
/// Returns an error if the product is unknown or there is not enough stock.
#[allow(clippy::print_stdout)]
pub async fn add_to_cart(
    ctx: &Context,
    product_id: i64,
    quantity: u32,
) -> Result<(), StorefrontError> {
    if quantity == 0 {
        return Err(StorefrontError::Input("quantity must be at least 1".to_string()));
    }
    let product = find_product(ctx, ProductId::new(product_id)).await?;

    let in_cart = ctx
        .sessions
        .cart()
        .await?
        .lines()
        .iter()
        .find(|line| line.product_id == product.id)
        .map_or(0, |line| line.quantity);
    if !product.has_stock(in_cart.saturating_add(quantity)) {
        return Err(StorefrontError::Input(format!(
            "only {} of {} in stock",
            product.stock_qty, product.name
        )));
    }

    let count = ctx
        .sessions
        .update_cart(|cart| {
            cart.add(&product, quantity);
            cart.item_count()
        })
        .await?;
    println!("Added {} x{quantity} ({count} item(s) in cart)", product.name);
    Ok(())
}

/// Change a line's quantity. Values below 1 are ignored.
///
/// # Errors
///
/// Returns an error if the local state cannot be written.
#[allow(clippy::print_stdout)]
pub async fn set_quantity(
    ctx: &Context,
    product_id: i64,
    quantity: u32,
) -> Result<(), StorefrontError> {
    let product_id = ProductId::new(product_id);
    let changed = ctx
        .sessions
        .update_cart(|cart| cart.set_quantity(product_id, quantity))
        .await?;
    if changed {
        println!("Updated product {product_id} to x{quantity}");
    } else {
        println!("Nothing changed");
    }
    Ok(())
}

/// Remove a product from the cart.
///
/// # Errors
///
/// Returns an error if the local state cannot be written.
#[allow(clippy::print_stdout)]
pub async fn remove_from_cart(ctx: &Context, product_id: i64) -> Result<(), StorefrontError> {
    let product_id = ProductId::new(product_id);
    let removed = ctx
        .sessions
        .update_cart(|cart| cart.remove(product_id))
        .await?;
    if removed {
        println!("Removed product {product_id}");
    } else {
        println!("Product {product_id} is not in the cart");
    }
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the local state cannot be written.
#[allow(clippy::print_stdout)]
pub async fn clear_cart(ctx: &Context) -> Result<(), StorefrontError> {
    ctx.sessions.update_cart(Cart::clear).await?;
    println!("Cart cleared");
    Ok(())
}

/// Place the cart as a marketplace order.
///
/// # Errors
///
/// Returns an error if nobody is logged in, the input is invalid, or the
/// checkout fails. The cart is only cleared once the order is placed.
#[allow(clippy::print_stdout)]
pub async fn checkout(
    ctx: &Context,
    method: &str,
    shipping: ShippingArgs,
    customer_id: Option<i64>,
    answer: Option<PaymentAnswer>,
) -> Result<(), StorefrontError> {
    let session = ctx
        .sessions
        .current()
        .await?
        .ok_or(AuthError::NotLoggedIn)?;

    let payment_method: PaymentMethod = method.parse().map_err(StorefrontError::Input)?;
    let customer_id = customer_id
        .or_else(|| session.user_id.map(i64::from))
        .map(CustomerId::new)
        .ok_or_else(|| StorefrontError::Input("no customer id; pass --customer-id".to_string()))?;
    let address = ShippingAddress::parse(
        &shipping.name,
        &shipping.phone,
        &shipping.pincode,
        &shipping.address,
    )?;
    let draft = UserDraft::parse(&session.name, session.email.as_str(), &shipping.phone)
        .map_err(CheckoutError::from)?;

    let mut cart = ctx.sessions.cart().await?;
    let request = MarketplaceOrderRequest {
        customer_id,
        draft,
        address,
        payment_method,
    };

    let (orchestrator, ui) = ctx.orchestrator(answer);
    let placed = place_order(
        &ctx.backend,
        &orchestrator,
        &mut cart,
        request,
        ctx.config.checkout.currency,
    )
    .await;
    drop(orchestrator);
    ui.abort();
    let placed = placed?;

    ctx.sessions.save_cart(cart).await?;
    println!(
        "Order {} placed, total {}",
        placed.order.order_id, placed.order.total_amount
    );
    if let Some(payment_id) = &placed.payment_id {
        println!("Payment: {payment_id}");
    }
    println!("Next: {}", placed.redirect_to);
    Ok(())
}
