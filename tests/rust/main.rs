mod postgres;
mod resolver;
mod sql;
