mod functions;
mod values;
