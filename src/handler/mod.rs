pub mod freelancer;
pub mod offers;
pub mod payments;
pub mod wallet;
pub mod ws;
