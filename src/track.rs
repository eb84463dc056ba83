use log::{debug, error};
use ndarray::{aview1, Array2};
use rayon::prelude::*;

use crate::barycentric::barycentric;
use crate::error::{Error, Result};
use crate::locate::LocateOptions;
use crate::spatial_index::SpatialIndex;

/// Particle positions over time: one row per particle, one column per
/// timestep. Owned by the caller and only borrowed for the duration of a
/// mapping call.
#[derive(Debug, Clone)]
pub struct ParticleTrack {
    x: Array2<f64>,
    y: Array2<f64>,
    z: Option<Array2<f64>>,
}

impl ParticleTrack {
    /// Creates a track from x and y position arrays of matching shape.
    pub fn new(x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        Error::check_size("track y columns", x.ncols(), y.ncols())?;
        Error::check_size("track y rows", x.nrows(), y.nrows())?;
        Ok(Self { x, y, z: None })
    }

    /// Attaches particle depths (z positions), same shape as x and y.
    pub fn with_z(mut self, z: Array2<f64>) -> Result<Self> {
        Error::check_size("track z columns", self.x.ncols(), z.ncols())?;
        Error::check_size("track z rows", self.x.nrows(), z.nrows())?;
        self.z = Some(z);
        Ok(self)
    }

    /// (particle count, timestep count)
    pub fn shape(&self) -> (usize, usize) {
        self.x.dim()
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    pub fn z(&self) -> Option<&Array2<f64>> {
        self.z.as_ref()
    }
}

/// Per-particle, per-timestep fields derived from a track.
#[derive(Debug, Clone)]
pub struct MappedTrack {
    /// Enclosing triangle index (NaN when outside the mesh), optionally
    /// 1-based depending on the options of the mapping call.
    pub mesh_index: Array2<f64>,
    /// Surface elevation interpolated at the particle position. Present only
    /// when the mesh carries an elevation field and the track carries z.
    pub water_surface: Option<Array2<f64>>,
    /// `water_surface` minus the particle z position, same presence rule.
    pub depth_below_surface: Option<Array2<f64>>,
    /// Timesteps whose unit of work failed; their output columns stay NaN.
    /// Empty in normal operation.
    pub failed_steps: Vec<usize>,
}

/// Output columns of one timestep's unit of work.
struct StepColumns {
    mesh_index: Vec<f64>,
    water_surface: Option<Vec<f64>>,
    depth_below_surface: Option<Vec<f64>>,
}

impl SpatialIndex {
    /// Maps a particle track onto the mesh, one timestep at a time.
    ///
    /// Every timestep is an independent unit of work: select the particles
    /// with finite coordinates at that step, locate them (0-based
    /// internally), and, when the mesh carries an elevation field and the
    /// track carries z, interpolate that step's nodal elevations at each
    /// located particle. Units run on the rayon pool and their results are
    /// written to output columns addressed by timestep number, so the result
    /// is identical to a sequential loop regardless of scheduling. A failing
    /// unit leaves its column at NaN and is recorded in
    /// [`MappedTrack::failed_steps`] instead of aborting the rest of the
    /// batch.
    ///
    /// Re-basing to 1-based output (`options.one_based`) is applied once,
    /// globally, after all timesteps are assembled.
    pub fn map_track(&self, track: &ParticleTrack, options: &LocateOptions) -> Result<MappedTrack> {
        let (np, nt) = track.shape();
        let elevation = self.mesh().elevation();
        if let Some(elevation) = elevation {
            Error::check_size("elevation columns", nt, elevation.ncols())?;
        }
        // Surface fields need both the nodal elevations and the particle z
        let do_depth = elevation.is_some() && track.z().is_some();
        debug!(
            "mapping {np} particles over {nt} timesteps ({})",
            if do_depth {
                "with surface interpolation"
            } else {
                "mesh index only"
            }
        );

        let step_options = LocateOptions {
            one_based: false,
            ..options.clone()
        };
        let steps: Vec<Result<StepColumns>> = (0..nt)
            .into_par_iter()
            .map(|t| self.map_step(track, elevation, t, nt, do_depth, &step_options))
            .collect();

        let mut mesh_index = Array2::from_elem((np, nt), f64::NAN);
        let mut water_surface = do_depth.then(|| Array2::from_elem((np, nt), f64::NAN));
        let mut depth_below_surface = do_depth.then(|| Array2::from_elem((np, nt), f64::NAN));
        let mut failed_steps = Vec::new();
        for (t, step) in steps.into_iter().enumerate() {
            match step {
                Ok(columns) => {
                    mesh_index.column_mut(t).assign(&aview1(&columns.mesh_index));
                    if let (Some(out), Some(ws)) = (&mut water_surface, &columns.water_surface) {
                        out.column_mut(t).assign(&aview1(ws));
                    }
                    if let (Some(out), Some(db)) =
                        (&mut depth_below_surface, &columns.depth_below_surface)
                    {
                        out.column_mut(t).assign(&aview1(db));
                    }
                }
                Err(err) => {
                    error!("timestep {t} failed: {err}");
                    failed_steps.push(t);
                }
            }
        }

        if options.one_based {
            for v in mesh_index.iter_mut() {
                if v.is_finite() {
                    *v += 1.;
                }
            }
        }

        Ok(MappedTrack {
            mesh_index,
            water_surface,
            depth_below_surface,
            failed_steps,
        })
    }

    /// One timestep's unit of work.
    fn map_step(
        &self,
        track: &ParticleTrack,
        elevation: Option<&Array2<f64>>,
        t: usize,
        nt: usize,
        do_depth: bool,
        options: &LocateOptions,
    ) -> Result<StepColumns> {
        let np = track.shape().0;
        let xs = track.x().column(t);
        let ys = track.y().column(t);
        let zs = track.z().map(|z| z.column(t));

        // Particles with any non-finite coordinate at this step are skipped
        // outright; their outputs stay NaN.
        let valid: Vec<usize> = (0..np)
            .filter(|&p| {
                let finite_z = zs.map_or(true, |z| z[p].is_finite());
                xs[p].is_finite() && ys[p].is_finite() && finite_z
            })
            .collect();

        let mut mesh_index = vec![f64::NAN; np];
        if !valid.is_empty() {
            let xp: Vec<f64> = valid.iter().map(|&p| xs[p]).collect();
            let yp: Vec<f64> = valid.iter().map(|&p| ys[p]).collect();
            let found = self.locate(&xp, &yp, options)?;
            for (&p, value) in valid.iter().zip(found) {
                mesh_index[p] = value;
            }
        }

        let mut water_surface = do_depth.then(|| vec![f64::NAN; np]);
        let mut depth_below_surface = do_depth.then(|| vec![f64::NAN; np]);
        if do_depth {
            let (Some(elevation), Some(zs)) = (elevation, zs) else {
                return Err(Error::invalid_mesh(
                    "surface interpolation requested without elevation or z",
                ));
            };
            for &p in &valid {
                if mesh_index[p].is_nan() {
                    continue;
                }
                let tri = mesh_index[p] as usize;
                let verts = self.mesh().triangle(tri);
                // Interpolate with the selected triangle's own weights; a
                // fallback match may sit infinitesimally outside the triangle
                // and its weights still apply. Degenerate triangles are
                // skipped rather than divided by a near-zero determinant.
                let coords = self.mesh().triangle_coords(tri);
                let Some(w) = barycentric(coords, [xs[p], ys[p]]) else {
                    continue;
                };
                let nodal = [
                    elevation[[verts[0], t]],
                    elevation[[verts[1], t]],
                    elevation[[verts[2], t]],
                ];
                let surface = w.interpolate(nodal);
                if let Some(ws) = &mut water_surface {
                    ws[p] = surface;
                }
                if let Some(db) = &mut depth_below_surface {
                    db[p] = surface - zs[p];
                }
            }
        }

        if t % 50 == 0 {
            debug!("timestep {}/{}", t + 1, nt);
        }

        Ok(StepColumns {
            mesh_index,
            water_surface,
            depth_below_surface,
        })
    }
}
