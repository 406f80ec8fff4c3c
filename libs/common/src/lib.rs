pub mod interfaces {
    pub mod factory;
    pub mod pool;
    pub mod vrf_deposit;
}

pub mod projection;
