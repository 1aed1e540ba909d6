mod helpers;

mod goods;
mod orders;
mod rate_limit;
