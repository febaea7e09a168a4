use gate::RateGate;
use middleware::gate::RateGateMiddleware;

pub mod gate;

pub mod middleware {
    pub mod gate;
}

pub fn middleware(gate: RateGate) -> RateGateMiddleware {
    RateGateMiddleware::new(gate)
}
