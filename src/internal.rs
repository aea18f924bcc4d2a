use rand::Rng;


// Polar Box-Muller transformation

pub fn randn<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
  loop {
    let u: f64 = rng.gen_range(-1.0, 1.0);
    let v: f64 = rng.gen_range(-1.0, 1.0);
    let r = u * u + v * v;
    // Try again if outside interval
    if r == 0.0 || r >= 1.0 { continue }
    let c = (-2.0 * r.ln() / r).sqrt();
    return (u * c, v * c)
  }
}
