// src/ffi.rs
#![cfg(feature = "ffi")]

//! C FFI для CloudNSS (glibc NSS module ABI).
//!
//! Модель:
//! - Статусы возвращаются кодами enum nss_status (TRYAGAIN=-2 .. SUCCESS=1),
//!   причина — через errnop (int*), отдельно от статуса.
//! - Строковые поля записей живут в буфере вызывающей стороны; здесь только
//!   патчатся указатели (включая таблицу gr_mem внутри того же буфера).
//! - Ресолверы — процессные синглтоны (конфигурация из ENV при первом вызове).
//!
//! Безопасность/правила:
//! - Все указатели проверяются на NULL; out-указатели должны быть валидны.
//! - Имена — нуль-терминированные C-строки; не-UTF-8 имя = "нет такой записи".
//!
//! Компиляция:
//!   cargo build --release --features ffi
//! (crate-type cdylib уже включён в Cargo.toml)

use std::ffi::CStr;
use std::mem;
use std::ptr;
use std::slice;

use libc::{c_char, c_int, c_long, gid_t, group, passwd, size_t, uid_t};

use crate::buffer::{GroupEntry, PasswdEntry};
use crate::expand::grown_capacity;
use crate::remote::remote_resolver;
use crate::snapshot::passwd_snapshot;
use crate::status::{Errno, NssResult, NssStatus};

// ---------- nss_status codes (glibc) ----------

pub const NSS_STATUS_TRYAGAIN: c_int = -2;
pub const NSS_STATUS_UNAVAIL: c_int = -1;
pub const NSS_STATUS_NOTFOUND: c_int = 0;
pub const NSS_STATUS_SUCCESS: c_int = 1;

fn status_code(status: NssStatus) -> c_int {
    match status {
        NssStatus::Success => NSS_STATUS_SUCCESS,
        NssStatus::NotFound => NSS_STATUS_NOTFOUND,
        NssStatus::TryAgain => NSS_STATUS_TRYAGAIN,
        NssStatus::Unavailable => NSS_STATUS_UNAVAIL,
        NssStatus::Error => NSS_STATUS_UNAVAIL,
    }
}

fn errno_code(e: Errno) -> c_int {
    match e {
        Errno::None => 0,
        Errno::NoEnt => libc::ENOENT,
        Errno::Range => libc::ERANGE,
        Errno::Again => libc::EAGAIN,
        Errno::Inval => libc::EINVAL,
        Errno::NoMem => libc::ENOMEM,
        Errno::Io => libc::EIO,
    }
}

// ---------- Helpers ----------

unsafe fn set_errno(errnop: *mut c_int, e: Errno) {
    if !errnop.is_null() {
        *errnop = errno_code(e);
    }
}

unsafe fn cstr_name<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }
    CStr::from_ptr(name).to_str().ok()
}

unsafe fn fill_passwd(result: *mut passwd, entry: &PasswdEntry<'_>) {
    (*result).pw_name = entry.name.as_ptr() as *mut c_char;
    (*result).pw_passwd = entry.passwd.as_ptr() as *mut c_char;
    (*result).pw_uid = entry.uid as uid_t;
    (*result).pw_gid = entry.gid as gid_t;
    (*result).pw_gecos = entry.gecos.as_ptr() as *mut c_char;
    (*result).pw_dir = entry.dir.as_ptr() as *mut c_char;
    (*result).pw_shell = entry.shell.as_ptr() as *mut c_char;
}

unsafe fn fill_group(result: *mut group, buffer: *mut c_char, entry: &GroupEntry<'_>) {
    (*result).gr_name = entry.name.as_ptr() as *mut c_char;
    (*result).gr_passwd = entry.passwd.as_ptr() as *mut c_char;
    (*result).gr_gid = entry.gid as gid_t;
    // Таблица указателей уже зарезервирована маршалером внутри буфера.
    let table = buffer.add(entry.members_table.off) as *mut *mut c_char;
    for (i, member) in entry.members.iter().enumerate() {
        *table.add(i) = member.as_ptr() as *mut c_char;
    }
    *table.add(entry.members.len()) = ptr::null_mut();
    (*result).gr_mem = table;
}

unsafe fn finish_passwd(
    res: NssResult<PasswdEntry<'_>>,
    result: *mut passwd,
    errnop: *mut c_int,
) -> c_int {
    match res {
        NssResult::Found(entry) => {
            fill_passwd(result, &entry);
            NSS_STATUS_SUCCESS
        }
        other => {
            set_errno(errnop, other.errno());
            status_code(other.status())
        }
    }
}

unsafe fn finish_group(
    res: NssResult<GroupEntry<'_>>,
    result: *mut group,
    buffer: *mut c_char,
    errnop: *mut c_int,
) -> c_int {
    match res {
        NssResult::Found(entry) => {
            fill_group(result, buffer, &entry);
            NSS_STATUS_SUCCESS
        }
        other => {
            set_errno(errnop, other.errno());
            status_code(other.status())
        }
    }
}

// ---------- Remote lookups ----------

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_getpwuid_r(
    uid: uid_t,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_passwd(remote_resolver().get_uid(uid as u32, buf), result, errnop)
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_getpwnam_r(
    name: *const c_char,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let name = match cstr_name(name) {
        Some(n) => n,
        None => {
            set_errno(errnop, Errno::NoEnt);
            return NSS_STATUS_NOTFOUND;
        }
    };
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_passwd(remote_resolver().get_name(name, buf), result, errnop)
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_getgrgid_r(
    gid: gid_t,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_group(
        remote_resolver().get_group_gid(gid as u32, buf),
        result,
        buffer,
        errnop,
    )
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_getgrnam_r(
    name: *const c_char,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let name = match cstr_name(name) {
        Some(n) => n,
        None => {
            set_errno(errnop, Errno::NoEnt);
            return NSS_STATUS_NOTFOUND;
        }
    };
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_group(
        remote_resolver().get_group_name(name, buf),
        result,
        buffer,
        errnop,
    )
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_initgroups_dyn(
    user: *const c_char,
    _skipgroup: gid_t,
    start: *mut c_long,
    size: *mut c_long,
    groupsp: *mut *mut gid_t,
    limit: c_long,
    errnop: *mut c_int,
) -> c_int {
    if user.is_null() || start.is_null() || size.is_null() || groupsp.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let user = match cstr_name(user) {
        Some(u) => u,
        None => {
            set_errno(errnop, Errno::NoEnt);
            return NSS_STATUS_NOTFOUND;
        }
    };
    let grouplist = match remote_resolver().groups_for_user(user) {
        NssResult::Found(groups) => groups,
        other => {
            set_errno(errnop, other.errno());
            return NSS_STATUS_NOTFOUND;
        }
    };

    let mut groups = *groupsp;
    for entry in &grouplist {
        // Resize the caller's array if needed.
        if *start == *size {
            let newsize = match grown_capacity(*size as usize, limit as i64) {
                Ok(n) => n,
                Err(e) => {
                    set_errno(errnop, e);
                    return NSS_STATUS_TRYAGAIN;
                }
            };
            let newgroups = libc::realloc(
                groups as *mut libc::c_void,
                newsize * mem::size_of::<gid_t>(),
            ) as *mut gid_t;
            if newgroups.is_null() {
                set_errno(errnop, Errno::Again);
                return NSS_STATUS_TRYAGAIN;
            }
            groups = newgroups;
            *groupsp = newgroups;
            *size = newsize as c_long;
        }
        *groups.add(*start as usize) = entry.gid as gid_t;
        *start += 1;
    }
    NSS_STATUS_SUCCESS
}

// Перечисление через remote-модуль намеренно не реализовано: хостовое
// getpwent идёт через snapshot-модуль ниже.

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_getpwent_r(
    _result: *mut passwd,
    _buffer: *mut c_char,
    _buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    set_errno(errnop, Errno::NoEnt);
    NSS_STATUS_NOTFOUND
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_setpwent(_stayopen: c_int) -> c_int {
    NSS_STATUS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_endpwent() -> c_int {
    NSS_STATUS_SUCCESS
}

// ---------- Snapshot-file lookups ----------

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_cache_setpwent(_stayopen: c_int) -> c_int {
    status_code(passwd_snapshot().setent())
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_cache_endpwent() -> c_int {
    status_code(passwd_snapshot().endent())
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_cache_getpwent_r(
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_passwd(passwd_snapshot().getent(buf), result, errnop)
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_cache_getpwuid_r(
    uid: uid_t,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_passwd(passwd_snapshot().find_uid(uid as u32, buf), result, errnop)
}

#[no_mangle]
pub unsafe extern "C" fn _nss_cloudnss_cache_getpwnam_r(
    name: *const c_char,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    if result.is_null() || buffer.is_null() {
        set_errno(errnop, Errno::Inval);
        return NSS_STATUS_UNAVAIL;
    }
    let name = match cstr_name(name) {
        Some(n) => n,
        None => {
            set_errno(errnop, Errno::NoEnt);
            return NSS_STATUS_NOTFOUND;
        }
    };
    let buf = slice::from_raw_parts_mut(buffer as *mut u8, buflen);
    finish_passwd(passwd_snapshot().find_name(name, buf), result, errnop)
}
