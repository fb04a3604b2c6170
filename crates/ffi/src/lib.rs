//! C interface to amrscope.
//!
//! Every fallible function returns an [`AmrErrorCode`] and records a message that
//! [`amr_get_last_error`] exposes until the next call on the same thread. Snapshots and
//! datasets are opaque heap handles: create them with `amr_snapshot_open`, `amr_snapshot_load`
//! or the region functions, release them with the matching `*_destroy`.
//!
//! ```c
//! AmrSnapshotParams params = { .path = "/data/sim", .output = 80, .ncpu = 64, ... };
//! AmrSnapshot* snap = NULL;
//! amr_snapshot_open(&params, &snap);
//!
//! double nan = 0.0 / 0.0;
//! AmrRange range = { {nan, nan}, {nan, nan}, {nan, nan}, AMR_CENTER_MODE_BOX_CENTER, {0}, "kpc" };
//! AmrShape sphere = { AMR_SHAPE_KIND_SPHERE, 12.0, 0.0, AMR_AXIS_Z };
//! AmrDataset *gas = NULL, *core = NULL;
//! amr_snapshot_load(snap, AMR_FIELD_GROUP_HYDRO, NULL, NULL, 0, -1, &gas);
//! amr_dataset_subregion(gas, &sphere, &range, false, &core);
//! ```

mod error;
mod handles;
mod helpers;

pub use error::{amr_get_last_error, amr_get_last_error_code, AmrErrorCode};
pub use handles::{
    AmrAxis, AmrCenterMode, AmrDataset, AmrFieldGroup, AmrRange, AmrShape, AmrShapeKind, AmrShell,
    AmrShellKind, AmrSnapshot, AmrSnapshotParams, AmrUnits,
};

use amrscope_core::{
    shellregion, subregion, LoadRequest, Shape, Shell, VariableRef, VariableSelection,
};
use std::ffi::c_char;
use std::ptr;

use crate::error::DefaultAmrError;
use crate::handles::{parse_unit, range_spec};
use crate::helpers::{required, required_str, track_result};

fn write_out<T>(out: *mut T, value: T, name: &str) -> Result<(), DefaultAmrError> {
    if out.is_null() {
        return Err(DefaultAmrError::null_pointer(name));
    }
    // SAFETY: checked non-null; the caller guarantees it is writable
    unsafe { out.write(value) };
    Ok(())
}

fn write_handle<T>(out: *mut *mut T, value: T, name: &str) -> Result<(), DefaultAmrError> {
    if out.is_null() {
        return Err(DefaultAmrError::null_pointer(name));
    }
    write_out(out, Box::into_raw(Box::new(value)), name)
}

fn copy_into(
    values: &[f64],
    out_values: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> Result<(), DefaultAmrError> {
    write_out(out_len, values.len(), "out_len")?;
    if values.len() > capacity {
        return Err(DefaultAmrError::buffer_too_small(values.len(), capacity));
    }
    if values.is_empty() {
        return Ok(());
    }
    if out_values.is_null() {
        return Err(DefaultAmrError::null_pointer("out_values"));
    }
    // SAFETY: the caller guarantees `capacity` writable values at `out_values`
    unsafe { ptr::copy_nonoverlapping(values.as_ptr(), out_values, values.len()) };
    Ok(())
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Open an output from its scalars.
///
/// No file is read; missing or corrupt rank files surface at load time.
///
/// # Errors
/// `InvalidConfiguration` for unusable metadata (zero `ncpu`, non-positive box length,
/// inverted levels), `NullPointer` / `InvalidParameter` for bad arguments.
///
/// # Safety
/// `params` must point to a valid [`AmrSnapshotParams`] whose `path` is a null-terminated
/// string; `out_snapshot` must be writable.
#[no_mangle]
pub unsafe extern "C" fn amr_snapshot_open(
    params: *const AmrSnapshotParams,
    out_snapshot: *mut *mut AmrSnapshot,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let params = unsafe { required(params, "params") }?;
        // SAFETY: forwarded caller contract
        let inner = unsafe { params.open() }?;
        write_handle(out_snapshot, AmrSnapshot { inner }, "out_snapshot")
    })
}

/// Release a snapshot. Datasets loaded from it stay valid.
///
/// # Safety
/// `snapshot` must be null or a handle from [`amr_snapshot_open`] not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn amr_snapshot_destroy(snapshot: *mut AmrSnapshot) {
    if !snapshot.is_null() {
        // SAFETY: handle came from Box::into_raw
        drop(unsafe { Box::from_raw(snapshot) });
    }
}

/// Simulation time in `unit` (null for code units).
///
/// # Safety
/// `snapshot` must be a live handle, `unit` null or a valid string, `out_time` writable.
#[no_mangle]
pub unsafe extern "C" fn amr_snapshot_time(
    snapshot: *const AmrSnapshot,
    unit: *const c_char,
    out_time: *mut f64,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let snapshot = unsafe { required(snapshot, "snapshot") }?;
        // SAFETY: forwarded caller contract
        let unit = unsafe { parse_unit(unit) }?;
        write_out(out_time, snapshot.inner.time(unit), "out_time")
    })
}

/// Box side length in `unit` (null for code units).
///
/// # Safety
/// `snapshot` must be a live handle, `unit` null or a valid string, `out_length` writable.
#[no_mangle]
pub unsafe extern "C" fn amr_snapshot_box_length(
    snapshot: *const AmrSnapshot,
    unit: *const c_char,
    out_length: *mut f64,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let snapshot = unsafe { required(snapshot, "snapshot") }?;
        // SAFETY: forwarded caller contract
        let unit = unsafe { parse_unit(unit) }?;
        write_out(out_length, snapshot.inner.box_length(unit), "out_length")
    })
}

/// Load a field group.
///
/// `group` is an [`AmrFieldGroup`] value. `range` may be null for the whole domain. `variables` holds `variable_count` names
/// (`"rho"`, `"var3"`); pass null and 0 for every declared variable. A negative `lmax`
/// keeps every level.
///
/// # Errors
/// `InvalidConfiguration` before any file is opened, then `MissingFile`, `Io` or
/// `InvalidFile` naming the failing rank.
///
/// # Safety
/// Pointers must be null or valid for the documented lengths; `out_dataset` writable.
#[no_mangle]
pub unsafe extern "C" fn amr_snapshot_load(
    snapshot: *const AmrSnapshot,
    group: u32,
    range: *const AmrRange,
    variables: *const *const c_char,
    variable_count: usize,
    lmax: i32,
    out_dataset: *mut *mut AmrDataset,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let snapshot = unsafe { required(snapshot, "snapshot") }?;
        let group = AmrFieldGroup::try_from(group)?;
        // SAFETY: forwarded caller contract
        let ranges = unsafe { range_spec(range) }?;

        let selection = if variable_count == 0 {
            VariableSelection::All
        } else {
            if variables.is_null() {
                return Err(DefaultAmrError::null_pointer("variables"));
            }
            // SAFETY: caller guarantees `variable_count` entries
            let names = unsafe { std::slice::from_raw_parts(variables, variable_count) };
            let refs = names
                .iter()
                // SAFETY: each entry is a valid string per the caller contract
                .map(|&name| unsafe { required_str(name, "variables") }.map(VariableRef::from))
                .collect::<Result<Vec<_>, _>>()?;
            VariableSelection::List(refs)
        };

        let mut request = LoadRequest::new().ranges(ranges).variables(selection);
        if lmax >= 0 {
            let lmax = u8::try_from(lmax)
                .map_err(|_| DefaultAmrError::invalid_parameter("lmax", "exceeds 255"))?;
            request = request.lmax(lmax);
        }

        let inner = snapshot.inner.load(group.into(), &request)?;
        write_handle(out_dataset, AmrDataset { inner }, "out_dataset")
    })
}

// ============================================================================
// DATASETS
// ============================================================================

/// Keep the rows inside `shape` (or outside with `inverse`).
///
/// Cuboids use the axis ranges of `range`; cylinders and spheres use its center and unit,
/// defaulting to the box center. `range` may be null.
///
/// # Safety
/// `dataset` must be a live handle, `shape` valid, `range` null or valid, `out_dataset`
/// writable.
#[no_mangle]
pub unsafe extern "C" fn amr_dataset_subregion(
    dataset: *const AmrDataset,
    shape: *const AmrShape,
    range: *const AmrRange,
    inverse: bool,
    out_dataset: *mut *mut AmrDataset,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let dataset = unsafe { required(dataset, "dataset") }?;
        // SAFETY: forwarded caller contract
        let shape = Shape::try_from(unsafe { required(shape, "shape") }?)?;
        // SAFETY: forwarded caller contract
        let spec = unsafe { range_spec(range) }?;
        let options = Default::default();
        let inner = subregion(&dataset.inner, &shape, &spec, inverse, &options)?;
        write_handle(out_dataset, AmrDataset { inner }, "out_dataset")
    })
}

/// Keep the rows between the inner and outer radius of `shell` (or the rest with `inverse`).
///
/// # Safety
/// As for [`amr_dataset_subregion`].
#[no_mangle]
pub unsafe extern "C" fn amr_dataset_shellregion(
    dataset: *const AmrDataset,
    shell: *const AmrShell,
    range: *const AmrRange,
    inverse: bool,
    out_dataset: *mut *mut AmrDataset,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let dataset = unsafe { required(dataset, "dataset") }?;
        // SAFETY: forwarded caller contract
        let shell = Shell::try_from(unsafe { required(shell, "shell") }?)?;
        // SAFETY: forwarded caller contract
        let spec = unsafe { range_spec(range) }?;
        let options = Default::default();
        let inner = shellregion(&dataset.inner, &shell, &spec, inverse, &options)?;
        write_handle(out_dataset, AmrDataset { inner }, "out_dataset")
    })
}

/// Number of rows.
///
/// # Safety
/// `dataset` must be a live handle and `out_len` writable.
#[no_mangle]
pub unsafe extern "C" fn amr_dataset_len(
    dataset: *const AmrDataset,
    out_len: *mut usize,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let dataset = unsafe { required(dataset, "dataset") }?;
        write_out(out_len, dataset.inner.len(), "out_len")
    })
}

/// Copy a float column in `unit` (null for code units) into `out_values`.
///
/// The row count is always written to `out_len`; pass a null buffer with zero capacity to
/// query it. A short buffer returns `BufferTooSmall` and copies nothing.
///
/// # Safety
/// `dataset` must be a live handle, `name` a valid string, `unit` null or a valid string,
/// `out_values` valid for `capacity` writes, `out_len` writable.
#[no_mangle]
pub unsafe extern "C" fn amr_dataset_copy_column(
    dataset: *const AmrDataset,
    name: *const c_char,
    unit: *const c_char,
    out_values: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let dataset = unsafe { required(dataset, "dataset") }?;
        // SAFETY: forwarded caller contract
        let name = unsafe { required_str(name, "name") }?;
        // SAFETY: forwarded caller contract
        let unit = unsafe { parse_unit(unit) }?;
        let values = dataset.inner.variable(name, unit)?;
        copy_into(&values, out_values, capacity, out_len)
    })
}

/// Copy row positions as interleaved `x, y, z` triples in a spatial `unit` (null for
/// fractions of the box). `capacity` and `out_len` count doubles, three per row.
///
/// # Safety
/// As for [`amr_dataset_copy_column`].
#[no_mangle]
pub unsafe extern "C" fn amr_dataset_copy_positions(
    dataset: *const AmrDataset,
    unit: *const c_char,
    out_values: *mut f64,
    capacity: usize,
    out_len: *mut usize,
) -> AmrErrorCode {
    track_result(|| {
        // SAFETY: forwarded caller contract
        let dataset = unsafe { required(dataset, "dataset") }?;
        // SAFETY: forwarded caller contract
        let unit = unsafe { parse_unit(unit) }?;
        let values: Vec<f64> = dataset
            .inner
            .positions(unit)?
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect();
        copy_into(&values, out_values, capacity, out_len)
    })
}

/// Release a dataset.
///
/// # Safety
/// `dataset` must be null or a handle not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn amr_dataset_destroy(dataset: *mut AmrDataset) {
    if !dataset.is_null() {
        // SAFETY: handle came from Box::into_raw
        drop(unsafe { Box::from_raw(dataset) });
    }
}
