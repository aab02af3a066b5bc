pub mod post_sales;
