/*!
# Random Hyperbolic Graphs (threshold case)

`n` points are placed on a hyperbolic disk of radius `R` with radial
density controlled by `alpha = (plexp - 1) / 2`; two vertices are adjacent
iff their hyperbolic distance is below `R`. The disk is partitioned into
concentric *bands*; candidates for a vertex are found by scanning, per
band, only the angular window that can possibly contain partners.

The coordinate stream is a pure function of the seed: every rank derives
the identical point set and keeps exactly the ordered pairs whose tail it
owns, so the union across ranks carries both directions of every edge
without any communication. The disk radius is either given directly or
fitted to a target average degree.
*/

use std::f64::consts::{LN_2, PI, TAU};

use itertools::Itertools;
use rand::Rng;

use crate::config::GeneratorConfig;
use crate::edge::{Edge, VertexRange};
use crate::error::Error;
use crate::gens::{Coordinates, Graph, GraphGenerator};
use crate::utils::Sampler;

/// A coordinate in hyperbolic space consists of an angle `phi`, a radius
/// `rad` and the vertex `id`.
///
/// `sinh(rad), cosh(rad), sin(phi), cos(phi)` and the id of the band in
/// which `rad` lies are precomputed; `rad` itself is only kept for the
/// coordinate output.
#[derive(Debug, Clone, Copy)]
struct Coord {
    id: u64,
    phi: f64,
    rad: f64,
    bid: usize,
    rad_cosh: f64,
    rad_sinh: f64,
    phi_cos: f64,
    phi_sin: f64,
}

/// Random hyperbolic graph generator.
pub struct Rhg {
    n: u64,
    alpha: f64,
    radius: Option<f64>,
    avg_degree: f64,
    sampler: Sampler,
    want_coordinates: bool,
    rank: usize,
    size: usize,
}

impl Rhg {
    /// Builds the generator for one rank.
    pub fn new(config: &GeneratorConfig, rank: usize, size: usize) -> Result<Self, Error> {
        Ok(Self {
            n: config.n,
            alpha: (config.plexp - 1.0) / 2.0,
            radius: (config.r > 0.0).then_some(config.r),
            avg_degree: config.avg_degree,
            sampler: config.sampler(),
            want_coordinates: config.coordinates,
            rank,
            size,
        })
    }

    /// Computes for a given number of nodes `n`, average degree `k` and
    /// `alpha` the fitting disk radius.
    ///
    /// Adopted from `NetworKIT`.
    fn target_radius(n: f64, k: f64, alpha: f64) -> Option<f64> {
        fn expected_degree(n: f64, alpha: f64, rad: f64) -> f64 {
            let gamma = 2.0 * alpha + 1.0;
            let xi = (gamma - 1.0) / (gamma - 2.0);
            let first_sum_term = (-rad / 2.0).exp();
            let second_sum_term = (-alpha * rad).exp()
                * (alpha
                    * (rad / 2.0)
                    * ((PI / 4.0) * (1.0 / alpha).powi(2) - (PI - 1.0) * (1.0 / alpha)
                        + (PI - 2.0))
                    - 1.0);
            (2.0 / PI) * xi * xi * n * (first_sum_term + second_sum_term)
        }

        let gamma = 2.0 * alpha + 1.0;
        let xi_inv = (gamma - 2.0) / (gamma - 1.0);
        let v = k * (PI / 2.0) * xi_inv * xi_inv;
        let current_r = 2.0 * (n / v).ln();
        let mut lower_bound = current_r / 2.0;
        let mut upper_bound = current_r * 2.0;

        if expected_degree(n, alpha, lower_bound) <= k
            || expected_degree(n, alpha, upper_bound) >= k
        {
            return None;
        }

        loop {
            let current_r = (lower_bound + upper_bound) / 2.0;
            let current_k = expected_degree(n, alpha, current_r);

            if current_k < k {
                upper_bound = current_r;
            } else {
                lower_bound = current_r;
            }

            if (current_k - k).abs() < 1e-5 {
                return Some(current_r);
            }
        }
    }

    /// Samples the full coordinate set from the seed, in id order.
    /// Returns the coordinates plus the number of points per band.
    fn sample_coordinates(
        &self,
        disk_rad: f64,
        band_limits: &[f64],
    ) -> (Vec<Coord>, Vec<u64>) {
        let mut rng = self.sampler.rng(0);

        let min = 1.0_f64.next_up();
        let max = (self.alpha * disk_rad).cosh();
        let mut band_sizes = vec![0u64; band_limits.len()];

        let coords = (0..self.n)
            .map(|id| {
                let phi = rng.random_range(0.0..TAU);
                let rad = rng.random_range(min..max).acosh() / self.alpha;

                // Linear reverse search is fastest as there are only a few
                // bands and lower bands hold exponentially fewer points
                let bid = band_limits
                    .iter()
                    .enumerate()
                    .rev()
                    .find(|(_, limit)| rad >= **limit)
                    .map(|(i, _)| i)
                    .unwrap_or(0);

                band_sizes[bid] += 1;
                Coord {
                    id,
                    phi,
                    rad,
                    bid,
                    rad_cosh: rad.cosh(),
                    rad_sinh: rad.sinh(),
                    phi_cos: phi.cos(),
                    phi_sin: phi.sin(),
                }
            })
            .collect();

        (coords, band_sizes)
    }

    /// Binary-searches a band slab (sorted by `phi`) for the first index
    /// holding a point with `phi > val`.
    fn partition_point(slab: &[Coord], val: f64) -> usize {
        slab.partition_point(|c| c.phi <= val)
    }

    /// The angular half-window around `u` within which a point at radius
    /// `band_rad` can lie within hyperbolic distance `R`; `None` when the
    /// bound degenerates and the whole band must be scanned.
    fn angular_window(u: &Coord, band_cosh: f64, band_sinh: f64, radius_cosh: f64) -> Option<f64> {
        let theta = ((u.rad_cosh * band_cosh - radius_cosh) / (u.rad_sinh * band_sinh)).acos();
        theta.is_finite().then_some(theta)
    }
}

impl GraphGenerator for Rhg {
    fn almost_undirected(&self) -> bool {
        true
    }

    fn generate(&mut self) -> Result<Graph, Error> {
        let range = VertexRange::balanced(self.n, self.rank, self.size);

        let radius = match self.radius {
            Some(radius) => radius,
            None => Self::target_radius(self.n as f64, self.avg_degree, self.alpha).ok_or_else(
                || {
                    Error::config(format!(
                        "no disk radius fits n = {}, average degree {}, alpha {}",
                        self.n, self.avg_degree, self.alpha
                    ))
                },
            )?,
        };

        // Band layout per "Communication-free Massively Distributed Graph
        // Generation" [Funke et al.]: a wide inner disk, then bands of
        // equal radial width.
        let num_bands = 2.max((radius * self.alpha / 2.0 / LN_2).ceil() as usize);
        let band_limits: Vec<f64> = [0.0, radius / 2.0]
            .into_iter()
            .chain(
                (1..num_bands)
                    .map(|i| radius / 2.0 / (num_bands - 1) as f64 * i as f64 + radius / 2.0),
            )
            .collect();
        let band_cosh_sinh = band_limits
            .iter()
            .map(|b| (b.cosh(), b.sinh()))
            .collect_vec();
        let radius_cosh = radius.cosh();

        let (unsorted, band_sizes) = self.sample_coordinates(radius, &band_limits);

        let coordinates = if self.want_coordinates {
            Coordinates::TwoD(
                unsorted
                    .iter()
                    .filter(|c| range.contains(c.id))
                    .map(|c| [c.phi, c.rad])
                    .collect(),
            )
        } else {
            Coordinates::None
        };

        let mut coords = unsorted;
        coords.sort_unstable_by(|u, v| {
            (u.bid, u.phi)
                .partial_cmp(&(v.bid, v.phi))
                .expect("hyperbolic coordinates are finite")
        });

        let mut band_bounds = Vec::with_capacity(band_sizes.len() + 1);
        band_bounds.push(0usize);
        let mut prefix = 0usize;
        for &band_size in &band_sizes {
            prefix += band_size as usize;
            band_bounds.push(prefix);
        }

        // Enumerate each unordered pair once: `u` scans its own and all
        // outer bands; within the own band only partners with larger id
        // count. Both ordered copies are emitted, filtered by ownership.
        let mut edges = Vec::new();
        for u in &coords {
            for bid in u.bid..band_sizes.len() {
                let slab = &coords[band_bounds[bid]..band_bounds[bid + 1]];
                if slab.is_empty() {
                    continue;
                }

                // Scan window from the band's lower limit; accept window
                // from its upper limit (no distance check needed inside).
                let scan =
                    Self::angular_window(u, band_cosh_sinh[bid].0, band_cosh_sinh[bid].1, radius_cosh);
                let accept = Self::angular_window(
                    u,
                    band_cosh_sinh[bid + 1].0,
                    band_cosh_sinh[bid + 1].1,
                    radius_cosh,
                );

                let mut visit = |v: &Coord| {
                    if bid == u.bid && u.id >= v.id {
                        return;
                    }

                    let within_inner = match accept {
                        Some(theta) => {
                            let delta = (u.phi - v.phi).abs();
                            delta.min(TAU - delta) < theta
                        }
                        None => false,
                    };
                    let connected = within_inner || {
                        let dist_cosh = u.rad_cosh * v.rad_cosh
                            - u.rad_sinh
                                * v.rad_sinh
                                * (u.phi_cos * v.phi_cos + u.phi_sin * v.phi_sin);
                        dist_cosh < radius_cosh
                    };

                    if connected {
                        if range.contains(u.id) {
                            edges.push(Edge(u.id, v.id));
                        }
                        if range.contains(v.id) {
                            edges.push(Edge(v.id, u.id));
                        }
                    }
                };

                match scan {
                    None => slab.iter().for_each(&mut visit),
                    Some(theta) => {
                        let lo = (u.phi - theta).rem_euclid(TAU);
                        let hi = (u.phi + theta).rem_euclid(TAU);
                        let start = Self::partition_point(slab, lo).saturating_sub(1);
                        let end = (Self::partition_point(slab, hi) + 1).min(slab.len());
                        if lo <= hi {
                            slab[start..end].iter().for_each(&mut visit);
                        } else {
                            // Window wraps around 0/TAU
                            slab[start..].iter().for_each(&mut visit);
                            slab[..end].iter().for_each(&mut visit);
                        }
                    }
                }
            }
        }

        edges.sort_unstable();
        edges.dedup();

        Ok(Graph {
            edges,
            vertex_range: range,
            coordinates,
            vertex_weights: Vec::new(),
            edge_weights: Vec::new(),
        })
    }
}
