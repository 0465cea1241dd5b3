use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::geometry::Measurement;

/// `[x, y, s, r, vx, vy, vs]`
pub type StateVector = SVector<f32, 7>;
pub type StateCovariance = SMatrix<f32, 7, 7>;

const DIM_X: usize = 7;
const DIM_Z: usize = 4;

/// Noise weighting of the box filter. All terms scale an identity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseWeights {
    /// Measurement noise on `(s, r)`.
    pub measurement_scale_sr: f32,
    /// Initial covariance on the velocity terms.
    pub initial_velocity_scale: f32,
    /// Overall initial covariance, applied after the velocity scaling.
    pub initial_scale: f32,
    /// Process noise on `(vx, vy, vs)`.
    pub process_velocity_scale: f32,
    /// Extra process noise factor on `vs`, on top of `process_velocity_scale`.
    pub process_area_velocity_scale: f32,
}

impl Default for NoiseWeights {
    fn default() -> Self {
        NoiseWeights {
            measurement_scale_sr: 10.0,
            initial_velocity_scale: 1000.0,
            initial_scale: 10.0,
            process_velocity_scale: 0.01,
            process_area_velocity_scale: 0.01,
        }
    }
}

/// Constant-velocity Kalman filter over `[x, y, s, r, vx, vy, vs]`.
///
/// The filter itself is stateless; each track carries its own mean and
/// covariance and passes them in.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: SMatrix<f32, DIM_X, DIM_X>,
    update_mat: SMatrix<f32, DIM_Z, DIM_X>,
    process_noise: StateCovariance,
    measurement_noise: SMatrix<f32, DIM_Z, DIM_Z>,
    initial_covariance: StateCovariance,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self::with_noise(&NoiseWeights::default())
    }

    pub fn with_noise(noise: &NoiseWeights) -> Self {
        // x, y and s advance by their velocity; r has no velocity term
        let mut motion_mat = SMatrix::<f32, DIM_X, DIM_X>::identity();
        for i in 0..3 {
            motion_mat[(i, DIM_Z + i)] = 1.0;
        }
        let update_mat = SMatrix::<f32, DIM_Z, DIM_X>::identity();

        let measurement_noise = SMatrix::<f32, DIM_Z, DIM_Z>::from_diagonal(
            &SVector::<f32, DIM_Z>::from_iterator([
                1.0,
                1.0,
                noise.measurement_scale_sr,
                noise.measurement_scale_sr,
            ]),
        );

        let vel = noise.initial_velocity_scale;
        let initial_covariance = StateCovariance::from_diagonal(&StateVector::from_iterator([
            1.0, 1.0, 1.0, 1.0, vel, vel, vel,
        ])) * noise.initial_scale;

        let q_vel = noise.process_velocity_scale;
        let process_noise = StateCovariance::from_diagonal(&StateVector::from_iterator([
            1.0,
            1.0,
            1.0,
            1.0,
            q_vel,
            q_vel,
            q_vel * noise.process_area_velocity_scale,
        ]));

        KalmanFilter {
            motion_mat,
            update_mat,
            process_noise,
            measurement_noise,
            initial_covariance,
        }
    }

    /// Create a track state from a `[x, y, s, r]` measurement; velocities start at zero.
    pub fn initiate(&self, measurement: &Measurement) -> (StateVector, StateCovariance) {
        let mut mean = StateVector::zeros();
        mean.fixed_rows_mut::<DIM_Z>(0).copy_from(measurement);
        (mean, self.initial_covariance)
    }

    /// Predict step: x' = F x, P' = F P F^T + Q
    pub fn predict(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
    ) -> (StateVector, StateCovariance) {
        let new_mean = self.motion_mat * mean;
        let new_cov =
            self.motion_mat * covariance * self.motion_mat.transpose() + self.process_noise;
        (new_mean, new_cov)
    }

    /// Project state to measurement space: z = H x, S = H P H^T + R
    pub fn project(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
    ) -> (Measurement, SMatrix<f32, DIM_Z, DIM_Z>) {
        let z_mean = self.update_mat * mean;
        let s_cov =
            self.update_mat * covariance * self.update_mat.transpose() + self.measurement_noise;
        (z_mean, s_cov)
    }

    /// Correction step. Returns `None` when the innovation covariance
    /// cannot be inverted.
    pub fn update(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
        measurement: &Measurement,
    ) -> Option<(StateVector, StateCovariance)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        // K = P H^T S^-1, solved as S K^T = H P
        let pht = covariance * self.update_mat.transpose();
        let kalman_gain = projected_cov.lu().solve(&pht.transpose())?.transpose();

        let innovation = measurement - projected_mean;
        let new_mean = mean + kalman_gain * innovation;

        // Joseph form keeps the covariance symmetric positive semi-definite
        let i_kh = StateCovariance::identity() - kalman_gain * self.update_mat;
        let new_cov = i_kh * covariance * i_kh.transpose()
            + kalman_gain * self.measurement_noise * kalman_gain.transpose();

        Some((new_mean, new_cov))
    }
}
